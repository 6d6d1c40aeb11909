//! Heuristic land/water classification.
//!
//! Decides whether a coordinate is plausibly navigable water, using fixed
//! tables of coarse bounding regions. This exists only to filter obviously
//! wrong or on-land vessel reports before they reach the map; it is nowhere
//! near navigation grade and is not meant to be.
//!
//! When no table matches, the answer is **water**: showing a questionable
//! vessel is preferred over hiding a valid one, so the error bias is
//! asymmetric on purpose. Callers depend on that bias and on the check
//! ordering below; neither should be "fixed" with real shoreline data.

use once_cell::sync::Lazy;

/// A coarse axis-aligned region in degrees.
#[derive(Debug, Clone, Copy)]
pub struct GeoBounds {
    pub name: &'static str,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GeoBounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

const fn bounds(
    name: &'static str,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
) -> GeoBounds {
    GeoBounds {
        name,
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

/// Continental interiors and deserts: a match here is definitely not
/// navigable water.
static INTERIOR_LANDMASSES: Lazy<Vec<GeoBounds>> = Lazy::new(|| {
    vec![
        bounds("sahara", 16.0, 30.0, -10.0, 30.0),
        bounds("arabian-interior", 18.0, 26.0, 40.0, 48.0),
        bounds("central-asia", 40.0, 50.0, 62.0, 95.0),
        bounds("siberian-interior", 55.0, 70.0, 70.0, 140.0),
        bounds("north-american-plains", 31.0, 48.0, -110.0, -95.0),
        bounds("amazon-interior", -15.0, 0.0, -70.0, -50.0),
        bounds("central-africa", -10.0, 10.0, 12.0, 35.0),
        bounds("australian-outback", -30.0, -20.0, 120.0, 145.0),
        bounds("greenland-interior", 62.0, 80.0, -50.0, -30.0),
        bounds("antarctic-interior", -90.0, -75.0, -180.0, 180.0),
    ]
});

/// Major gulfs, straits and enclosed seas the tracked fleet actually sails.
static KNOWN_SEAS: Lazy<Vec<GeoBounds>> = Lazy::new(|| {
    vec![
        bounds("gulf-of-mexico", 18.5, 30.0, -97.5, -81.0),
        bounds("caribbean", 9.0, 22.0, -88.0, -60.0),
        bounds("mediterranean", 30.5, 45.0, -5.5, 36.0),
        bounds("north-sea", 51.0, 61.0, -4.0, 9.0),
        bounds("english-channel", 48.5, 51.2, -5.5, 2.0),
        bounds("baltic", 53.5, 66.0, 9.5, 30.0),
        bounds("persian-gulf", 23.5, 30.0, 48.0, 56.5),
        bounds("red-sea", 12.0, 30.0, 32.0, 43.5),
        bounds("arabian-sea", 5.0, 24.0, 52.0, 75.0),
        bounds("bay-of-bengal", 5.0, 22.0, 80.0, 95.0),
        bounds("strait-of-malacca", -1.0, 6.0, 95.0, 104.0),
        bounds("south-china-sea", 0.0, 23.0, 105.0, 121.0),
        bounds("sea-of-japan", 34.0, 48.0, 128.0, 142.0),
        bounds("gulf-of-guinea", -5.0, 5.0, -8.0, 9.0),
    ]
});

/// Open-ocean bands, kept clear of the continental shelves.
static OPEN_OCEANS: Lazy<Vec<GeoBounds>> = Lazy::new(|| {
    vec![
        bounds("north-atlantic", 5.0, 55.0, -55.0, -15.0),
        bounds("south-atlantic", -45.0, -5.0, -35.0, 5.0),
        bounds("north-pacific-east", 5.0, 50.0, -175.0, -130.0),
        bounds("north-pacific-west", 5.0, 45.0, 145.0, 179.9),
        bounds("south-pacific", -50.0, -5.0, -160.0, -90.0),
        bounds("indian-ocean", -40.0, 0.0, 55.0, 100.0),
        bounds("southern-ocean", -64.0, -56.0, -180.0, 180.0),
    ]
});

/// Rough continental outlines used only by the final fallback step. These
/// deliberately include coastlines and near-shore water; anything the
/// earlier water tables already claimed never reaches them.
static CONTINENTAL_OUTLINES: Lazy<Vec<GeoBounds>> = Lazy::new(|| {
    vec![
        bounds("north-america", 15.0, 72.0, -168.0, -52.0),
        bounds("south-america", -56.0, 13.0, -82.0, -34.0),
        bounds("eurasia", 35.0, 78.0, -10.0, 180.0),
        bounds("africa", -35.0, 37.0, -18.0, 52.0),
        bounds("australia", -44.0, -10.0, 112.0, 154.0),
        bounds("antarctica", -90.0, -60.0, -180.0, 180.0),
    ]
});

/// Returns true when the coordinate is plausibly navigable water.
///
/// Checks run in a fixed order and the first match wins:
/// 1. out-of-range coordinates are never water;
/// 2. interior landmasses are land;
/// 3. known seas and shipping lanes are water;
/// 4. open-ocean bands are water;
/// 5. otherwise a coarse continental outline marks land, and anything left
///    defaults to water.
pub fn is_navigable_water(lat: f64, lng: f64) -> bool {
    if !lat.is_finite() || !lng.is_finite() {
        return false;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return false;
    }

    if let Some(region) = INTERIOR_LANDMASSES.iter().find(|b| b.contains(lat, lng)) {
        log::trace!("({}, {}) matched interior landmass {}", lat, lng, region.name);
        return false;
    }

    if KNOWN_SEAS.iter().any(|b| b.contains(lat, lng)) {
        return true;
    }

    if OPEN_OCEANS.iter().any(|b| b.contains(lat, lng)) {
        return true;
    }

    // Coarse fallback: inside a rough continental outline counts as land,
    // everything else (and anything ambiguous) as water.
    !CONTINENTAL_OUTLINES.iter().any(|b| b.contains(lat, lng))
}

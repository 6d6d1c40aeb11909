// src/geo/mod.rs
//! Great-circle math for the position pipeline.
//!
//! Every distance in this crate is kilometers. The upstream dashboard mixed
//! kilometers and nautical miles between utilities; here knots are converted
//! exactly once, at this boundary, and everything downstream stays metric.

pub mod classifier;

/// Mean Earth radius, matching the kilometer unit used throughout.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// One nautical mile in kilometers (and one knot in km/h).
pub const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Haversine great-circle distance between two points, in kilometers.
///
/// Inputs are decimal degrees. Returns 0 for identical points. NaN inputs
/// propagate as NaN; validating coordinates is the caller's job.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

    // clamp guards asin's domain against rounding above 1.0 and still
    // propagates NaN, unlike min.
    2.0 * EARTH_RADIUS_KM * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Initial compass bearing from point 1 to point 2, in degrees [0, 360).
///
/// Ill-defined when the points coincide; returns 0 in that case rather than
/// NaN so the value is always safe to render.
pub fn bearing_deg(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if lat1 == lat2 && lng1 == lng2 {
        return 0.0;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Hours to cover `distance_km` at `speed_knots`.
///
/// Returns 0 when speed is zero or negative: a stationary vessel has no
/// defined arrival, and 0 keeps division-by-zero artifacts out of the UI.
pub fn eta_hours(distance_km: f64, speed_knots: f64) -> f64 {
    if speed_knots <= 0.0 {
        return 0.0;
    }
    distance_km / (speed_knots * KM_PER_NAUTICAL_MILE)
}

pub fn km_to_nm(km: f64) -> f64 {
    km / KM_PER_NAUTICAL_MILE
}

pub fn nm_to_km(nm: f64) -> f64 {
    nm * KM_PER_NAUTICAL_MILE
}

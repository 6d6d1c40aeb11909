// src/proximity/mod.rs
//! Vessel-to-shore proximity derivation for the map and mini-map views.
//! Everything here is recomputed on demand; results are cheap and caching
//! them would only add staleness bugs.

use itertools::Itertools;

use crate::geo::{self, classifier};
use crate::models::{
    Port, ProximityResult, Refinery, TargetKind, VesselConnection, VesselPosition,
};

/// A shore-side entity a vessel can be ranked against.
pub trait ProximityTarget {
    fn target_id(&self) -> u64;
    fn target_name(&self) -> &str;
    fn target_kind(&self) -> TargetKind;
    fn coordinates(&self) -> (f64, f64);
}

impl ProximityTarget for Port {
    fn target_id(&self) -> u64 {
        self.id
    }
    fn target_name(&self) -> &str {
        &self.name
    }
    fn target_kind(&self) -> TargetKind {
        TargetKind::Port
    }
    fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

impl ProximityTarget for Refinery {
    fn target_id(&self) -> u64 {
        self.id
    }
    fn target_name(&self) -> &str {
        &self.name
    }
    fn target_kind(&self) -> TargetKind {
        TargetKind::Refinery
    }
    fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

/// True iff the report's coordinates are in range and the land/water
/// heuristic calls them plausibly navigable. Used to suppress garbage
/// reports before any distance math; the filtering is silent by design.
pub fn is_valid_position(vessel: &VesselPosition) -> bool {
    vessel.has_valid_coordinates() && classifier::is_navigable_water(vessel.lat, vessel.lng)
}

/// Targets within `radius_km` of the vessel, ascending by distance. Ties
/// break on target id so the ordering is deterministic.
pub fn nearest_targets<T: ProximityTarget>(
    vessel: &VesselPosition,
    targets: &[T],
    radius_km: f64,
) -> Vec<ProximityResult> {
    if !is_valid_position(vessel) {
        return Vec::new();
    }

    targets
        .iter()
        .filter_map(|target| {
            let (lat, lng) = target.coordinates();
            let distance_km = geo::distance_km(vessel.lat, vessel.lng, lat, lng);
            if distance_km > radius_km {
                return None;
            }
            Some(ProximityResult {
                vessel_id: vessel.id,
                target_id: target.target_id(),
                target_name: target.target_name().to_string(),
                target_kind: target.target_kind(),
                distance_km,
                bearing_deg: geo::bearing_deg(vessel.lat, vessel.lng, lat, lng),
                eta_hours: geo::eta_hours(distance_km, vessel.speed_knots.unwrap_or(0.0)),
            })
        })
        .sorted_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.target_id.cmp(&b.target_id))
        })
        .collect()
}

/// Derives the route-line records the dashboard draws: for each valid
/// vessel, its single nearest port and nearest refinery within radius.
pub fn connections_for(
    vessels: &[VesselPosition],
    ports: &[Port],
    refineries: &[Refinery],
    radius_km: f64,
) -> Vec<VesselConnection> {
    let mut connections = Vec::new();
    let mut next_id: u64 = 1;

    for vessel in vessels.iter().filter(|v| is_valid_position(v)) {
        let nearest_port = nearest_targets(vessel, ports, radius_km).into_iter().next();
        let nearest_refinery = nearest_targets(vessel, refineries, radius_km)
            .into_iter()
            .next();

        for result in [nearest_port, nearest_refinery].into_iter().flatten() {
            connections.push(VesselConnection {
                id: next_id,
                vessel_id: vessel.id,
                target_id: result.target_id,
                target_kind: result.target_kind,
                distance_km: result.distance_km,
                eta_hours: result.eta_hours,
            });
            next_id += 1;
        }
    }

    connections
}

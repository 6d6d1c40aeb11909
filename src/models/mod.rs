// src/models/mod.rs
//! Data models shared across the feed pipeline: vessel positions, ports,
//! refineries and the derived view-model types handed to the presentation
//! layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single vessel report as received from the upstream feed.
///
/// Positions are overwritten wholesale on every update; there is no partial
/// patching and no explicit deletion. Entries age out only when a full
/// refresh omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselPosition {
    pub id: u64,
    #[serde(default)]
    pub imo: String,
    #[serde(default)]
    pub mmsi: String,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Speed over ground in knots.
    #[serde(rename = "speed", default)]
    pub speed_knots: Option<f64>,
    /// Heading in degrees, when the transponder reports one.
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub departure_port: Option<String>,
    #[serde(default)]
    pub destination_port: Option<String>,
    #[serde(default)]
    pub eta: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl VesselPosition {
    /// Coordinate-range invariant: lat in [-90, 90], lng in [-180, 180].
    /// A report failing this is never forwarded to consumers.
    pub fn has_valid_coordinates(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl Default for VesselPosition {
    fn default() -> Self {
        Self {
            id: 0,
            imo: String::new(),
            mmsi: String::new(),
            name: String::new(),
            lat: 0.0,
            lng: 0.0,
            speed_knots: None,
            heading: None,
            departure_port: None,
            destination_port: None,
            eta: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type", default)]
    pub port_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refinery {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Kind of shore-side target a vessel can be paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Port,
    Refinery,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Port => write!(f, "port"),
            TargetKind::Refinery => write!(f, "refinery"),
        }
    }
}

/// A derived vessel-to-target pairing the dashboard draws as a route line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselConnection {
    pub id: u64,
    pub vessel_id: u64,
    pub target_id: u64,
    pub target_kind: TargetKind,
    pub distance_km: f64,
    pub eta_hours: f64,
}

/// View-model for one page of the feed. Recomputed on every cache update or
/// pagination request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub vessels: Vec<VesselPosition>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Result of a proximity query: one target within radius of a vessel.
/// All distances in this crate are kilometers; knots are converted once at
/// the geo boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    pub vessel_id: u64,
    pub target_id: u64,
    pub target_name: String,
    pub target_kind: TargetKind,
    pub distance_km: f64,
    pub bearing_deg: f64,
    /// Hours to reach the target at the vessel's reported speed; 0 when the
    /// vessel is stationary or reports no speed.
    pub eta_hours: f64,
}

/// Feed health counters, updated by the stream client as messages arrive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetrics {
    pub messages_received: u64,
    pub data_updates: u64,
    pub invalid_positions_dropped: u64,
    pub malformed_messages: u64,
    pub heartbeats: u64,
    pub reconnect_attempts: u32,
    pub last_message_timestamp: Option<u64>,
}

/// REST envelope for the vessel listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselListResponse {
    pub vessels: Vec<VesselPosition>,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn coordinate_range_invariant() {
        let mut pos = VesselPosition {
            lat: 29.7604,
            lng: -95.3698,
            ..Default::default()
        };
        assert!(pos.has_valid_coordinates());

        pos.lat = 90.1;
        assert!(!pos.has_valid_coordinates());

        pos.lat = -29.0;
        pos.lng = -180.5;
        assert!(!pos.has_valid_coordinates());

        pos.lng = f64::NAN;
        assert!(!pos.has_valid_coordinates());
    }

    #[test]
    fn vessel_position_wire_format() {
        let json = r#"{
            "id": 7,
            "imo": "9321483",
            "mmsi": "311000199",
            "name": "Pacific Voyager",
            "lat": 25.1,
            "lng": -90.2,
            "speed": 13.5,
            "heading": 78.0,
            "departurePort": "Houston",
            "destinationPort": "Rotterdam",
            "status": "underway"
        }"#;
        let pos: VesselPosition = serde_json::from_str(json).unwrap();
        assert_eq!(pos.id, 7);
        assert_eq!(pos.speed_knots, Some(13.5));
        assert_eq!(pos.departure_port.as_deref(), Some("Houston"));
        assert_eq!(pos.eta, None);
    }

    #[test]
    fn port_type_wire_rename() {
        let json = r#"{"id":1,"name":"Rotterdam","country":"NL","region":"europe","lat":51.95,"lng":4.1,"type":"deepwater"}"#;
        let port: Port = serde_json::from_str(json).unwrap();
        assert_eq!(port.port_type.as_deref(), Some("deepwater"));
    }
}

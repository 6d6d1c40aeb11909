pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod geo;
pub mod models;
pub mod proximity;
pub mod utils;
pub mod websocket;

// Re-export the surface the presentation layer works against.
pub use cache::{CacheTtls, EntityKind, RegionalCache};
pub use error::FeedError;
pub use feed::{ConnectionType, FeedSnapshot, VesselFeedController};
pub use models::{FeedPage, Port, ProximityResult, Refinery, VesselPosition};
pub use websocket::{ConnectionState, StreamClient, StreamClientSettings, StreamRequest};

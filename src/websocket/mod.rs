pub mod stream_client;

pub use stream_client::{
    ConnectionState, StreamClient, StreamClientSettings, StreamEvent, StreamRequest,
    StreamRequestPatch, StreamSubscription,
};

pub mod broadcast;
pub mod config;
pub mod registry;
pub mod signaling;

pub use broadcast::RoomBroadcaster;
pub use config::{ConfigError, ServerConfig};
pub use registry::SessionRegistry;
pub use signaling::{SignalingRouter, ws_handler};

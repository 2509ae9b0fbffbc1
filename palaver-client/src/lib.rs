pub mod command;
pub mod engine;
pub mod event;
pub mod media;
pub mod session;

pub use command::EngineCommand;
pub use engine::CallEngine;
pub use event::EngineEvent;
pub use media::{ConnectivityState, MediaEvent, MediaFactory, MediaSession};
pub use session::{NegotiationState, PeerSession};

pub mod model;

pub use model::{ChatBroadcast, ClientSignal, ConnId, ServerSignal};

mod rtc;

pub use rtc::{RtcConfig, RtcMediaFactory, RtcMediaSession};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Connectivity of the underlying peer connection, reduced to the states
/// the negotiation engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Asynchronous notifications from the media capability. These arrive on
/// the per-session event channel handed to the factory; once the engine
/// drops its receiver, late callbacks go nowhere.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    /// A local ICE candidate was discovered (serialized candidate JSON).
    /// Multi-shot: fires once per discovered candidate.
    CandidateGenerated(String),
    ConnectivityChanged(ConnectivityState),
    RemoteTrackArrived { track_id: String },
}

/// The narrow seam over the platform's peer-connection capability.
///
/// Offer/answer creation also sets the local description, mirroring how
/// every caller uses the two together.
#[async_trait]
pub trait MediaSession: Send {
    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_offer(&self, sdp: String) -> Result<()>;

    async fn set_remote_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate_json: String) -> Result<()>;

    /// Attach whatever local media the backend has captured. Failure is
    /// not fatal to the session; the call proceeds receive-only.
    async fn attach_local_media(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait MediaFactory: Send + Sync {
    async fn create_session(
        &self,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Box<dyn MediaSession>>;
}

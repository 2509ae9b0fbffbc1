use palaver_core::{ChatBroadcast, ConnId};

/// Observable side effects of the negotiation state machine, consumed by
/// whatever renders the UI. The engine never touches presentation
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The server told us which id it assigned to our connection.
    Welcome(ConnId),

    PeerJoined(ConnId),

    PeerLeft(ConnId),

    ChatReceived(ChatBroadcast),

    /// Desired enablement of the call / hang-up controls.
    Controls {
        call_enabled: bool,
        hangup_enabled: bool,
    },

    CallConnected,

    RemoteTrack { track_id: String },

    /// The session ended; drop any remote media display.
    RemoteMediaCleared,

    /// Local capture could not be attached; the session continues
    /// receive-only.
    LocalMediaFailed(String),
}

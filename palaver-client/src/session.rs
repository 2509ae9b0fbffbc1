use crate::media::MediaSession;
use palaver_core::ConnId;
use std::collections::VecDeque;

/// Negotiation progress with one remote party. Every non-terminal state
/// has a transition to `Closed`; there is no unhandled failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Offering,
    Connecting,
    Connected,
    Closed,
}

/// One in-flight or established negotiation. Candidates that arrive
/// before a remote description is set are parked in `pending_ice` and
/// flushed once the description lands; candidate-vs-description arrival
/// order is not guaranteed by the transport.
pub struct PeerSession {
    pub remote: Option<ConnId>,
    pub state: NegotiationState,
    pub remote_description_set: bool,
    pub local_media_attached: bool,
    pub pending_ice: VecDeque<String>,
    pub media: Box<dyn MediaSession>,
}

impl PeerSession {
    pub fn new(media: Box<dyn MediaSession>) -> Self {
        Self {
            remote: None,
            state: NegotiationState::Idle,
            remote_description_set: false,
            local_media_attached: false,
            pending_ice: VecDeque::new(),
            media,
        }
    }
}

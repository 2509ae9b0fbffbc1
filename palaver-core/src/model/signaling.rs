use crate::model::conn::ConnId;
use serde::{Deserialize, Serialize};

/// Signals a client emits towards the server. The tag is the wire event
/// name; anything that does not parse into this union is dropped at the
/// transport boundary.
///
/// The sender identity is never part of the payload; the server stamps
/// it from the transport connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientSignal {
    #[serde(rename = "join-room")]
    JoinRoom(String),

    #[serde(rename = "chat-message")]
    ChatMessage {
        room: String,
        name: String,
        message: String,
    },

    /// `to` absent means "broadcast to my room".
    #[serde(rename = "webrtc-offer")]
    Offer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
        offer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<ConnId>,
    },

    /// Answers are only meaningful directed at the offerer.
    #[serde(rename = "webrtc-answer")]
    Answer { to: ConnId, answer: String },

    #[serde(rename = "webrtc-ice-candidate")]
    IceCandidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<ConnId>,
        candidate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<String>,
    },
}

/// Signals the server pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerSignal {
    /// Sent once right after connect, carrying the id the server assigned
    /// to this connection.
    #[serde(rename = "welcome")]
    Welcome { id: ConnId },

    #[serde(rename = "user-joined")]
    UserJoined(ConnId),

    #[serde(rename = "chat-message")]
    Chat(ChatBroadcast),

    #[serde(rename = "webrtc-offer")]
    Offer { from: ConnId, offer: String },

    #[serde(rename = "webrtc-answer")]
    Answer { from: ConnId, answer: String },

    #[serde(rename = "webrtc-ice-candidate")]
    IceCandidate { from: ConnId, candidate: String },

    #[serde(rename = "user-disconnected")]
    UserDisconnected(ConnId),
}

/// Chat line as relayed to room members. `time` is unix millis assigned
/// by the server at receipt, not trusted from the sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcast {
    pub sender_id: ConnId,
    pub name: String,
    pub message: String,
    pub time: u64,
}

use crate::broadcast::RoomBroadcaster;
use crate::registry::SessionRegistry;
use palaver_core::{ChatBroadcast, ClientSignal, ConnId, ServerSignal};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Stamps every inbound signal with the verified transport identity and
/// routes it: direct when a target is named, room broadcast otherwise.
///
/// The router validates nothing about SDP or candidate contents (that is
/// the endpoints' concern) and it never fails a connection over a bad
/// message; it logs and drops.
#[derive(Clone)]
pub struct SignalingRouter {
    registry: Arc<SessionRegistry>,
    broadcaster: Arc<RoomBroadcaster>,
}

impl SignalingRouter {
    pub fn new(registry: Arc<SessionRegistry>, broadcaster: Arc<RoomBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Register a freshly connected peer and tell it the id it was
    /// assigned.
    pub fn handle_connect(&self, conn: ConnId, tx: mpsc::UnboundedSender<ServerSignal>) {
        self.broadcaster.add_peer(conn.clone(), tx);
        self.broadcaster
            .send_direct(&conn, ServerSignal::Welcome { id: conn.clone() });
        info!("peer connected: {conn}");
    }

    pub fn handle_signal(&self, sender: &ConnId, signal: ClientSignal) {
        match signal {
            ClientSignal::JoinRoom(room) => {
                if room.is_empty() {
                    warn!("{sender} tried to join a room with an empty name");
                    return;
                }
                self.registry.join(sender.clone(), &room);
                info!("{sender} joined room '{room}'");
                self.broadcaster
                    .broadcast(&room, sender, ServerSignal::UserJoined(sender.clone()));
            }

            ClientSignal::ChatMessage {
                room,
                name,
                message,
            } => {
                let chat = ServerSignal::Chat(ChatBroadcast {
                    sender_id: sender.clone(),
                    name,
                    message,
                    time: unix_millis(),
                });
                self.broadcaster.broadcast(&room, sender, chat);
            }

            ClientSignal::Offer { room, offer, to } => {
                let signal = ServerSignal::Offer {
                    from: sender.clone(),
                    offer,
                };
                self.route(sender, to, room, signal);
            }

            ClientSignal::Answer { to, answer } => {
                // Always direct; an answer is meaningless without its
                // offerer, and a departed one is simply dropped.
                self.broadcaster.send_direct(
                    &to,
                    ServerSignal::Answer {
                        from: sender.clone(),
                        answer,
                    },
                );
            }

            ClientSignal::IceCandidate {
                to,
                candidate,
                room,
            } => {
                let signal = ServerSignal::IceCandidate {
                    from: sender.clone(),
                    candidate,
                };
                self.route(sender, to, room, signal);
            }
        }
    }

    /// Transport disconnect: drop membership, then notify every connected
    /// peer. The notification is deliberately global, unlike the
    /// room-scoped join announcement.
    pub fn handle_disconnect(&self, conn: &ConnId) {
        self.broadcaster.remove_peer(conn);
        self.registry.leave(conn);
        info!("peer disconnected: {conn}");
        self.broadcaster
            .send_to_all(ServerSignal::UserDisconnected(conn.clone()));
    }

    /// Direct delivery when a target is named, otherwise broadcast to the
    /// sender's most recently joined room. A sender that never joined a
    /// room produces a no-op.
    fn route(
        &self,
        sender: &ConnId,
        to: Option<ConnId>,
        room_hint: Option<String>,
        signal: ServerSignal,
    ) {
        if let Some(target) = to {
            self.broadcaster.send_direct(&target, signal);
            return;
        }

        let room = room_hint.or_else(|| self.registry.room_of(sender));
        match room {
            Some(room) => self.broadcaster.broadcast(&room, sender, signal),
            None => debug!("{sender} sent a broadcast signal before joining a room, dropped"),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

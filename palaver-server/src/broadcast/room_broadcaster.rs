use crate::registry::SessionRegistry;
use dashmap::DashMap;
use palaver_core::{ConnId, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fan-out of server signals to connected peers. Each peer is reachable
/// through the unbounded channel its WebSocket send task drains, so
/// delivery is fire-and-forget and per-sender ordering is preserved by
/// the channel itself.
pub struct RoomBroadcaster {
    registry: Arc<SessionRegistry>,
    peers: DashMap<ConnId, mpsc::UnboundedSender<ServerSignal>>,
}

impl RoomBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            peers: DashMap::new(),
        }
    }

    pub fn add_peer(&self, conn: ConnId, tx: mpsc::UnboundedSender<ServerSignal>) {
        self.peers.insert(conn, tx);
    }

    pub fn remove_peer(&self, conn: &ConnId) {
        self.peers.remove(conn);
    }

    /// Deliver `signal` to every member of `room` except the sender.
    pub fn broadcast(&self, room: &str, sender: &ConnId, signal: ServerSignal) {
        // Collect targets first so no map guard is held while sending.
        let targets: Vec<ConnId> = self
            .registry
            .members_of(room)
            .into_iter()
            .filter(|member| member != sender)
            .collect();

        for target in targets {
            self.send_direct(&target, signal.clone());
        }
    }

    /// Deliver to exactly one connection. A target that has disconnected
    /// is not an error: signals for a departed peer are moot.
    pub fn send_direct(&self, target: &ConnId, signal: ServerSignal) {
        let Some(peer) = self.peers.get(target) else {
            debug!("dropping signal for disconnected peer {target}");
            return;
        };
        if peer.send(signal).is_err() {
            warn!("send channel for {target} is closed");
        }
    }

    /// Deliver to every connected peer, regardless of room membership.
    pub fn send_to_all(&self, signal: ServerSignal) {
        let targets: Vec<ConnId> = self.peers.iter().map(|entry| entry.key().clone()).collect();

        for target in targets {
            self.send_direct(&target, signal.clone());
        }
    }
}

use crate::command::EngineCommand;
use crate::event::EngineEvent;
use crate::media::{ConnectivityState, MediaEvent, MediaFactory};
use crate::session::{NegotiationState, PeerSession};
use anyhow::Result;
use palaver_core::{ClientSignal, ConnId, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Drives the negotiation state machine for one room. User commands,
/// server signals, and media-capability callbacks are all serialized
/// onto this single control loop, so a hangup can never race an
/// in-flight answer.
pub struct CallEngine {
    room: String,
    local_id: Option<ConnId>,
    local_media_enabled: bool,
    session: Option<PeerSession>,
    media_rx: Option<mpsc::Receiver<MediaEvent>>,
    factory: Arc<dyn MediaFactory>,
    command_rx: mpsc::Receiver<EngineCommand>,
    signal_rx: mpsc::Receiver<ServerSignal>,
    signal_tx: mpsc::UnboundedSender<ClientSignal>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl CallEngine {
    pub fn new(
        room: String,
        factory: Arc<dyn MediaFactory>,
        command_rx: mpsc::Receiver<EngineCommand>,
        signal_rx: mpsc::Receiver<ServerSignal>,
        signal_tx: mpsc::UnboundedSender<ClientSignal>,
        event_tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            room,
            local_id: None,
            local_media_enabled: false,
            session: None,
            media_rx: None,
            factory,
            command_rx,
            signal_rx,
            signal_tx,
            event_tx,
        }
    }

    pub async fn run(mut self) {
        info!("call engine started, joining room '{}'", self.room);

        self.send_signal(ClientSignal::JoinRoom(self.room.clone()));
        self.emit(EngineEvent::Controls {
            call_enabled: true,
            hangup_enabled: false,
        });

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("command channel closed, stopping engine");
                            break;
                        }
                    }
                }

                signal = self.signal_rx.recv() => {
                    match signal {
                        Some(signal) => self.handle_signal(signal).await,
                        None => {
                            warn!("signaling transport closed");
                            break;
                        }
                    }
                }

                event = recv_media(&mut self.media_rx) => {
                    match event {
                        Some(event) => self.handle_media_event(event).await,
                        None => self.media_rx = None,
                    }
                }
            }
        }

        self.close_session().await;
        info!("call engine finished");
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Call => self.start_call().await,

            EngineCommand::HangUp => self.close_session().await,

            EngineCommand::EnableLocalMedia => self.enable_local_media().await,

            EngineCommand::SendChat { name, message } => {
                self.send_signal(ClientSignal::ChatMessage {
                    room: self.room.clone(),
                    name,
                    message,
                });
            }
        }
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::Welcome { id } => {
                debug!("assigned connection id {id}");
                self.local_id = Some(id.clone());
                self.emit(EngineEvent::Welcome(id));
            }

            ServerSignal::UserJoined(id) => self.emit(EngineEvent::PeerJoined(id)),

            ServerSignal::Chat(chat) => self.emit(EngineEvent::ChatReceived(chat)),

            ServerSignal::Offer { from, offer } => self.handle_remote_offer(from, offer).await,

            ServerSignal::Answer { from, answer } => self.handle_remote_answer(from, answer).await,

            ServerSignal::IceCandidate { from, candidate } => {
                self.handle_remote_candidate(from, candidate).await;
            }

            ServerSignal::UserDisconnected(id) => {
                self.emit(EngineEvent::PeerLeft(id.clone()));
                let is_remote_party = self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.remote.as_ref() == Some(&id));
                if is_remote_party {
                    info!("remote party {id} left, closing session");
                    self.close_session().await;
                }
            }
        }
    }

    /// Local call intent: open a session, produce an offer, broadcast it
    /// to the room.
    async fn start_call(&mut self) {
        if self.session.is_some() {
            warn!("call already in progress, ignoring");
            return;
        }
        if let Err(e) = self.open_session().await {
            error!("failed to create media session: {e:#}");
            return;
        }

        let offer = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            match session.media.create_offer().await {
                Ok(offer) => {
                    session.state = NegotiationState::Offering;
                    Some(offer)
                }
                Err(e) => {
                    error!("failed to create offer: {e:#}");
                    None
                }
            }
        };

        match offer {
            Some(offer) => {
                self.send_signal(ClientSignal::Offer {
                    room: Some(self.room.clone()),
                    offer,
                    to: None,
                });
                self.emit(EngineEvent::Controls {
                    call_enabled: false,
                    hangup_enabled: true,
                });
            }
            None => self.close_session().await,
        }
    }

    /// A remote party called us: apply their offer and answer it.
    ///
    /// When both sides offer at the same time, the tie is broken on
    /// connection ids: the lower id abandons its own offer and answers,
    /// the higher id keeps its offer and drops the remote one. Both
    /// peers apply the same rule, so exactly one offer survives.
    async fn handle_remote_offer(&mut self, from: ConnId, offer: String) {
        let offering = self
            .session
            .as_ref()
            .is_some_and(|session| session.state == NegotiationState::Offering);
        if offering {
            let yield_to_remote = self
                .local_id
                .as_ref()
                .is_some_and(|local| local.0 < from.0);
            if !yield_to_remote {
                debug!("simultaneous offer from {from} dropped, keeping ours");
                return;
            }
            info!("simultaneous offer from {from}, abandoning ours");
            self.close_session().await;
        }

        if self.session.is_none() {
            if let Err(e) = self.open_session().await {
                error!("failed to create media session: {e:#}");
                return;
            }
        }

        let answer = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            session.remote = Some(from.clone());
            if let Err(e) = session.media.set_remote_offer(offer).await {
                warn!("could not apply remote offer from {from}: {e:#}");
                return;
            }
            session.remote_description_set = true;
            flush_pending_ice(session).await;

            match session.media.create_answer().await {
                Ok(answer) => {
                    session.state = NegotiationState::Connecting;
                    Some(answer)
                }
                Err(e) => {
                    error!("failed to create answer for {from}: {e:#}");
                    None
                }
            }
        };

        match answer {
            Some(answer) => {
                self.send_signal(ClientSignal::Answer { to: from, answer });
                self.emit(EngineEvent::Controls {
                    call_enabled: false,
                    hangup_enabled: true,
                });
            }
            None => self.close_session().await,
        }
    }

    async fn handle_remote_answer(&mut self, from: ConnId, answer: String) {
        let Some(session) = self.session.as_mut() else {
            warn!("answer from {from} with no session in flight, dropped");
            return;
        };
        if session.state != NegotiationState::Offering {
            warn!(
                "unexpected answer from {from} in state {:?}, dropped",
                session.state
            );
            return;
        }

        // The offer went out as a room broadcast; whoever answers first
        // becomes the session's remote party.
        session.remote.get_or_insert(from.clone());

        match session.media.set_remote_answer(answer).await {
            Ok(()) => {
                session.remote_description_set = true;
                session.state = NegotiationState::Connecting;
                flush_pending_ice(session).await;
            }
            Err(e) => warn!("could not apply answer from {from}: {e:#}"),
        }
    }

    /// Candidates may arrive before the remote description; park them in
    /// the session queue instead of failing, and drop them outright when
    /// no session exists at all.
    async fn handle_remote_candidate(&mut self, from: ConnId, candidate: String) {
        let Some(session) = self.session.as_mut() else {
            debug!("candidate from {from} with no session, dropped");
            return;
        };

        if session.remote_description_set {
            if let Err(e) = session.media.add_ice_candidate(candidate).await {
                warn!("candidate from {from} could not be applied: {e:#}");
            }
        } else {
            session.pending_ice.push_back(candidate);
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::CandidateGenerated(candidate) => {
                let Some(session) = self.session.as_ref() else {
                    return;
                };
                let to = session.remote.clone();
                let room = to.is_none().then(|| self.room.clone());
                self.send_signal(ClientSignal::IceCandidate {
                    to,
                    candidate,
                    room,
                });
            }

            MediaEvent::ConnectivityChanged(state) => match state {
                ConnectivityState::Connected => {
                    if let Some(session) = self.session.as_mut() {
                        session.state = NegotiationState::Connected;
                        self.emit(EngineEvent::CallConnected);
                    }
                }
                ConnectivityState::Disconnected
                | ConnectivityState::Failed
                | ConnectivityState::Closed => {
                    info!("connectivity lost ({state:?}), closing session");
                    self.close_session().await;
                }
                other => debug!("connectivity state: {other:?}"),
            },

            MediaEvent::RemoteTrackArrived { track_id } => {
                self.emit(EngineEvent::RemoteTrack { track_id });
            }
        }
    }

    async fn open_session(&mut self) -> Result<()> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let media = self.factory.create_session(events_tx).await?;
        let mut session = PeerSession::new(media);

        if self.local_media_enabled {
            match session.media.attach_local_media().await {
                Ok(()) => session.local_media_attached = true,
                Err(e) => {
                    warn!("local media unavailable: {e:#}");
                    self.emit(EngineEvent::LocalMediaFailed(format!("{e:#}")));
                }
            }
        }

        self.media_rx = Some(events_rx);
        self.session = Some(session);
        Ok(())
    }

    async fn enable_local_media(&mut self) {
        self.local_media_enabled = true;

        let failure = match self.session.as_mut() {
            Some(session) if !session.local_media_attached => {
                match session.media.attach_local_media().await {
                    Ok(()) => {
                        session.local_media_attached = true;
                        None
                    }
                    Err(e) => Some(format!("{e:#}")),
                }
            }
            _ => None,
        };

        if let Some(reason) = failure {
            warn!("local media unavailable: {reason}");
            self.emit(EngineEvent::LocalMediaFailed(reason));
        }
    }

    /// The single teardown path, from any state. Taking the session out
    /// makes a second hangup a no-op, and dropping the event receiver
    /// turns any late capability callback into dead letters.
    async fn close_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.state = NegotiationState::Closed;
        self.media_rx = None;

        if let Err(e) = session.media.close().await {
            warn!("error closing media session: {e:#}");
        }

        self.emit(EngineEvent::RemoteMediaCleared);
        self.emit(EngineEvent::Controls {
            call_enabled: true,
            hangup_enabled: false,
        });
    }

    fn send_signal(&self, signal: ClientSignal) {
        if self.signal_tx.send(signal).is_err() {
            warn!("signaling transport closed, dropping outbound signal");
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }
}

async fn recv_media(rx: &mut Option<mpsc::Receiver<MediaEvent>>) -> Option<MediaEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn flush_pending_ice(session: &mut PeerSession) {
    while let Some(candidate) = session.pending_ice.pop_front() {
        if let Err(e) = session.media.add_ice_candidate(candidate).await {
            warn!("buffered candidate could not be applied: {e:#}");
        }
    }
}

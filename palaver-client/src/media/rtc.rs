use crate::media::{ConnectivityState, MediaEvent, MediaFactory, MediaSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_local::TrackLocal;

/// ICE configuration for the webrtc-rs backend.
#[derive(Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

/// Builds one `RtcMediaSession` per negotiation, sharing the ICE config
/// and the set of already-captured local tracks.
pub struct RtcMediaFactory {
    config: RtcConfig,
    local_tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl RtcMediaFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self {
            config,
            local_tracks: Vec::new(),
        }
    }

    pub fn with_local_tracks(mut self, tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        self.local_tracks = tracks;
        self
    }
}

#[async_trait]
impl MediaFactory for RtcMediaFactory {
    async fn create_session(
        &self,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Box<dyn MediaSession>> {
        let session =
            RtcMediaSession::new(self.config.clone(), self.local_tracks.clone(), events).await?;
        Ok(Box::new(session))
    }
}

/// `MediaSession` over a webrtc-rs `RTCPeerConnection`.
pub struct RtcMediaSession {
    peer_connection: Arc<RTCPeerConnection>,
    local_tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl RtcMediaSession {
    async fn new(
        config: RtcConfig,
        local_tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }],
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    debug!("peer connection state: {state:?}");
                    let _ = tx
                        .send(MediaEvent::ConnectivityChanged(map_state(state)))
                        .await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(json) = candidate.to_json() else {
                    return;
                };
                let Ok(serialized) = serde_json::to_string(&json) else {
                    return;
                };
                let _ = tx.send(MediaEvent::CandidateGenerated(serialized)).await;
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                debug!("remote track arrived: {}", track.id());
                let _ = tx
                    .send(MediaEvent::RemoteTrackArrived {
                        track_id: track.id(),
                    })
                    .await;
            })
        }));

        Ok(Self {
            peer_connection,
            local_tracks,
        })
    }
}

#[async_trait]
impl MediaSession for RtcMediaSession {
    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("failed to set local description")?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("failed to set local description")?;
        Ok(answer.sdp)
    }

    async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn set_remote_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate_json: String) -> Result<()> {
        let candidate: RTCIceCandidateInit =
            serde_json::from_str(&candidate_json).context("failed to parse ICE candidate JSON")?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn attach_local_media(&self) -> Result<()> {
        for track in &self.local_tracks {
            self.peer_connection
                .add_track(track.clone())
                .await
                .context("failed to attach local track")?;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection
            .close()
            .await
            .context("failed to close peer connection")?;
        Ok(())
    }
}

fn map_state(state: RTCPeerConnectionState) -> ConnectivityState {
    match state {
        RTCPeerConnectionState::Connecting => ConnectivityState::Connecting,
        RTCPeerConnectionState::Connected => ConnectivityState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectivityState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectivityState::Failed,
        RTCPeerConnectionState::Closed => ConnectivityState::Closed,
        _ => ConnectivityState::New,
    }
}

use anyhow::{Context, Result};
use palaver_client::{CallEngine, EngineCommand, EngineEvent};
use palaver_core::{ClientSignal, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::MockMediaFactory;

/// Timeout for engine output (ms).
pub const ENGINE_TIMEOUT_MS: u64 = 1000;

pub const TEST_ROOM: &str = "main";

/// A running engine plus both ends of every channel the engine talks
/// through.
pub struct TestHarness {
    pub factory: MockMediaFactory,
    pub command_tx: mpsc::Sender<EngineCommand>,
    pub signal_in_tx: mpsc::Sender<ServerSignal>,
    signal_out_rx: mpsc::UnboundedReceiver<ClientSignal>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
}

pub fn start_engine(factory: MockMediaFactory) -> TestHarness {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (signal_in_tx, signal_in_rx) = mpsc::channel(64);
    let (signal_out_tx, signal_out_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let engine = CallEngine::new(
        TEST_ROOM.to_string(),
        Arc::new(factory.clone()),
        command_rx,
        signal_in_rx,
        signal_out_tx,
        event_tx,
    );
    tokio::spawn(engine.run());

    TestHarness {
        factory,
        command_tx,
        signal_in_tx,
        signal_out_rx,
        event_rx,
    }
}

impl TestHarness {
    pub async fn recv_signal(&mut self) -> Result<ClientSignal> {
        let timeout = std::time::Duration::from_millis(ENGINE_TIMEOUT_MS);
        tokio::time::timeout(timeout, self.signal_out_rx.recv())
            .await
            .context("timed out waiting for outbound signal")?
            .context("outbound signal channel closed")
    }

    pub async fn recv_event(&mut self) -> Result<EngineEvent> {
        let timeout = std::time::Duration::from_millis(ENGINE_TIMEOUT_MS);
        tokio::time::timeout(timeout, self.event_rx.recv())
            .await
            .context("timed out waiting for engine event")?
            .context("engine event channel closed")
    }

    pub fn assert_no_events(&mut self) {
        if let Ok(event) = self.event_rx.try_recv() {
            panic!("expected no engine events, got {event:?}");
        }
    }

    pub fn assert_no_signals(&mut self) {
        if let Ok(signal) = self.signal_out_rx.try_recv() {
            panic!("expected no outbound signals, got {signal:?}");
        }
    }

    /// Swallow the room join and initial control state every engine
    /// produces on startup.
    pub async fn drain_startup(&mut self) -> Result<()> {
        match self.recv_signal().await? {
            ClientSignal::JoinRoom(room) if room == TEST_ROOM => {}
            other => anyhow::bail!("expected join-room on startup, got {other:?}"),
        }
        match self.recv_event().await? {
            EngineEvent::Controls {
                call_enabled: true,
                hangup_enabled: false,
            } => {}
            other => anyhow::bail!("expected initial controls, got {other:?}"),
        }
        Ok(())
    }

    /// Round-trip a chat line through the engine. Because the control
    /// loop is serial, seeing the chat signal come back proves all prior
    /// input has been processed.
    pub async fn sync(&mut self) -> Result<()> {
        self.command_tx
            .send(EngineCommand::SendChat {
                name: "sync".to_string(),
                message: "sync".to_string(),
            })
            .await
            .context("engine command channel closed")?;

        loop {
            match self.recv_signal().await? {
                ClientSignal::ChatMessage { name, .. } if name == "sync" => return Ok(()),
                _ => continue,
            }
        }
    }
}

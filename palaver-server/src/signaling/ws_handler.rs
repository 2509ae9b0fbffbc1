use crate::signaling::SignalingRouter;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use palaver_core::{ClientSignal, ConnId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(router): State<SignalingRouter>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, router))
}

async fn handle_socket(socket: WebSocket, router: SignalingRouter) {
    // Identity is assigned here, never taken from the client.
    let conn_id = ConnId::new();
    info!("new WebSocket connection: {conn_id}");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    router.handle_connect(conn_id.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            match serde_json::to_string(&signal) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("failed to serialize server signal: {e}"),
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let router = router.clone();
        let conn_id = conn_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                        Ok(signal) => router.handle_signal(&conn_id, signal),
                        Err(e) => warn!("invalid signal from {conn_id}: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    router.handle_disconnect(&conn_id);
    info!("WebSocket disconnected: {conn_id}");
}

//! WebSocket feed of widget instance updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();

    let receiver_count = state.tx.receiver_count();
    info!(receiver_count, "WebSocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let update = match rx.recv().await {
                Ok(update) => update,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client lagging, updates dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&update) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to encode instance update");
                    continue;
                }
            };
            debug!(instance_id = %update.instance_id, "Sending update to WebSocket client");
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                debug!("WebSocket client sent close frame");
                break;
            }
        }
    });

    run_until_first_exits(send_task, recv_task).await;

    info!("WebSocket client disconnected");
}

/// Wait for either task to finish, then abort the other so it releases its
/// half of the socket and its broadcast receiver.
async fn run_until_first_exits(mut send_task: JoinHandle<()>, mut recv_task: JoinHandle<()>) {
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_remaining_task_is_aborted() {
        let (held_tx, held_rx) = oneshot::channel::<()>();
        let pending = tokio::spawn(async move {
            let _held = held_tx;
            std::future::pending::<()>().await;
        });
        let finished = tokio::spawn(async {});

        run_until_first_exits(pending, finished).await;

        // The sender is dropped once the pending task is torn down.
        let closed = tokio::time::timeout(Duration::from_secs(1), held_rx).await;
        assert!(matches!(closed, Ok(Err(_))));
    }
}

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use super::protocol::{WsIncomingMessage, WsOutgoingMessage};
use crate::core::errors::ApiError;
use crate::graph::ProgressSink;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let outcome = match serde_json::from_str::<WsIncomingMessage>(&text) {
                    Ok(incoming) => handle_message(&mut sender, &state, incoming).await,
                    Err(err) => Err(ApiError::BadRequest(format!("Invalid message: {}", err))),
                };
                if let Err(err) = outcome {
                    tracing::warn!("WebSocket request failed: {}", err);
                    let _ = send_message(
                        &mut sender,
                        &WsOutgoingMessage::Error {
                            message: err.to_string(),
                        },
                    )
                    .await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn handle_message(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
    data: WsIncomingMessage,
) -> Result<(), ApiError> {
    match data.msg_type.as_deref().unwrap_or("") {
        "run" => {}
        other => {
            return Err(ApiError::BadRequest(format!(
                "Unknown message type: {:?}",
                other
            )))
        }
    }

    let collection = data
        .collection
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("collection is required".to_string()))?;
    let query = data
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query is required".to_string()))?;

    let agent = state.agent_for(&collection).await?;
    let (progress, mut rx) = ProgressSink::channel();
    let task = tokio::spawn(async move { agent.run(&query, progress).await });

    // The channel closes when the run drops its sink.
    while let Some(event) = rx.recv().await {
        let message = WsOutgoingMessage::Progress {
            progress: event.progress,
        };
        if let Err(err) = send_message(sender, &message).await {
            task.abort();
            return Err(err);
        }
    }

    let report = task.await.map_err(ApiError::internal)??;
    send_message(sender, &WsOutgoingMessage::Result { report }).await?;
    send_message(sender, &WsOutgoingMessage::Done).await
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &WsOutgoingMessage,
) -> Result<(), ApiError> {
    let text = serde_json::to_string(message).map_err(ApiError::internal)?;
    sender
        .send(Message::Text(text))
        .await
        .map_err(ApiError::internal)
}

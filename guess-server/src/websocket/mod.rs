use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::AppState;

pub mod handlers;
pub mod notifier;
pub mod session;


use handlers::CommandHandler;
pub use notifier::{DeliveryError, SessionId, SessionNotifier};
pub use session::Session;

pub async fn handle_connection(websocket: WebSocket, state: AppState) {
    let session_id = SessionId::new();
    info!("New WebSocket session: {}", session_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();

    let message_receiver = state.notifier.open_session(session_id).await;
    let session = Arc::new(Session::new(session_id, state.notifier.clone()));
    let handler = CommandHandler::new(session.clone(), state.clone());

    let incoming_handler = async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(msg) => {
                    // Binary and ping/pong frames are ignored
                    if let Ok(text) = msg.to_str() {
                        handler.handle_frame(text).await;
                    }
                }
                Err(e) => {
                    warn!("WebSocket error for {}: {}", session_id, e);
                    break;
                }
            }
        }
    };

    // Sole writer for this session
    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", session_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Session {} disconnected", session_id);
    session.close().await;
    state.notifier.close_session(session_id).await;
}

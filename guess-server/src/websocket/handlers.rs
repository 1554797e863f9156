use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info};

use guess_core::{GameError, GuessOutcome};
use guess_types::{
    CMD_GUESS, CMD_JOIN, CommandEnvelope, CommandReply, ErrorItem, GuessRequest, JoinRequest,
    REPLY_GUESS_RECEIVED, REPLY_WAITING, UNGUESSED,
};

use super::session::Session;
use crate::AppState;

/// Dispatches the text frames of one session to the game components.
#[derive(Clone)]
pub struct CommandHandler {
    session: Arc<Session>,
    state: AppState,
}

impl CommandHandler {
    pub fn new(session: Arc<Session>, state: AppState) -> Self {
        Self { session, state }
    }

    pub async fn handle_frame(&self, text: &str) {
        let envelope: CommandEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Unreadable frame on session {}: {}", self.session.id(), e);
                return self.session.reply(CommandReply::invalid_request()).await;
            }
        };

        match envelope.cmd.as_str() {
            CMD_JOIN => self.handle_join(text).await,
            CMD_GUESS => self.handle_guess(text).await,
            other => {
                debug!("Unknown command {:?} on session {}", other, self.session.id());
                self.session.reply(CommandReply::invalid_request()).await
            }
        }
    }

    async fn handle_join(&self, text: &str) {
        let Some(request) = self.parse::<JoinRequest>(CMD_JOIN, text).await else {
            return;
        };

        let player = match self.state.players.resolve(&request.id).await {
            Ok(player) => player,
            Err(e) => return self.fail(CMD_JOIN, e).await,
        };

        // Registered before joining so a tick right after the join is not missed
        let placement = self.state.notifier.await_placement(player).await;

        match self.state.pool.join(player).await {
            Ok(position) => {
                info!(
                    "Session {} joined player {} at position {}",
                    self.session.id(),
                    player,
                    position
                );
                self.session
                    .reply(CommandReply::ok(CMD_JOIN, REPLY_WAITING))
                    .await;
                self.session.watch_placement(player, placement).await;
            }
            Err(e) => self.fail(CMD_JOIN, e).await,
        }
    }

    async fn handle_guess(&self, text: &str) {
        let Some(request) = self.parse::<GuessRequest>(CMD_GUESS, text).await else {
            return;
        };

        if request.data == UNGUESSED {
            return self
                .session
                .reply(CommandReply::failed(CMD_GUESS, ErrorItem::InvalidParams))
                .await;
        }

        let receipt = match self
            .state
            .engine
            .submit_guess(&request.id, &request.room_id, request.data)
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => return self.fail(CMD_GUESS, e).await,
        };

        self.session
            .reply(CommandReply::ok(CMD_GUESS, REPLY_GUESS_RECEIVED))
            .await;

        if let GuessOutcome::Recorded { .. } = receipt.outcome {
            self.session
                .watch_completion(receipt.room, receipt.completion)
                .await;
        }
    }

    async fn parse<T: DeserializeOwned>(&self, cmd: &str, text: &str) -> Option<T> {
        match serde_json::from_str(text) {
            Ok(request) => Some(request),
            Err(e) => {
                debug!("Malformed {} payload: {}", cmd, e);
                self.session
                    .reply(CommandReply::failed(cmd, ErrorItem::InvalidParams))
                    .await;
                None
            }
        }
    }

    async fn fail(&self, cmd: &str, error: GameError) {
        debug!("{} rejected on session {}: {}", cmd, self.session.id(), error);
        self.session
            .reply(CommandReply::failed(cmd, error.item()))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::SessionId;
    use guess_types::{GuessRequest, JoinRequest, ServerMessage};
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    async fn handler() -> (CommandHandler, AppState, UnboundedReceiver<ServerMessage>) {
        let state = AppState::new();
        let id = SessionId::new();
        let receiver = state.notifier.open_session(id).await;
        let session = Arc::new(Session::new(id, state.notifier.clone()));
        (CommandHandler::new(session, state.clone()), state, receiver)
    }

    fn reply(message: ServerMessage) -> CommandReply {
        match message {
            ServerMessage::Reply(reply) => reply,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_frames_are_invalid_requests() {
        let (handler, _, mut receiver) = handler().await;

        for frame in ["not json", "{}", r#"{"cmd":"dance"}"#, r#"{"cmd":7}"#] {
            handler.handle_frame(frame).await;
            assert_eq!(
                reply(receiver.recv().await.unwrap()),
                CommandReply::invalid_request(),
                "frame {}",
                frame
            );
        }
    }

    #[tokio::test]
    async fn test_join_replies_waiting() {
        let (handler, state, mut receiver) = handler().await;
        let id = state.players.register("alice").await;

        let frame = serde_json::to_string(&JoinRequest::new(id.to_string())).unwrap();
        handler.handle_frame(&frame).await;

        assert_eq!(
            reply(receiver.recv().await.unwrap()),
            CommandReply::ok(CMD_JOIN, REPLY_WAITING)
        );
        assert!(state.pool.contains(id).await);
    }

    #[tokio::test]
    async fn test_join_errors() {
        let (handler, state, mut receiver) = handler().await;

        handler
            .handle_frame(r#"{"cmd":"join","id":"unknown-id"}"#)
            .await;
        assert_eq!(
            reply(receiver.recv().await.unwrap()),
            CommandReply::failed(CMD_JOIN, ErrorItem::NotRegistered)
        );

        handler.handle_frame(r#"{"cmd":"join"}"#).await;
        assert_eq!(
            reply(receiver.recv().await.unwrap()),
            CommandReply::failed(CMD_JOIN, ErrorItem::InvalidParams)
        );

        assert!(state.pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_guess_errors() {
        let (handler, state, mut receiver) = handler().await;
        let id = state.players.register("bob").await;

        let cases = [
            (
                GuessRequest::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string(), 3),
                ErrorItem::NotRegistered,
            ),
            (
                GuessRequest::new(id.to_string(), Uuid::new_v4().to_string(), 3),
                ErrorItem::NotFoundError,
            ),
            (
                GuessRequest::new(id.to_string(), "room-x", 3),
                ErrorItem::NotFoundError,
            ),
            (
                GuessRequest::new(id.to_string(), Uuid::new_v4().to_string(), -1),
                ErrorItem::InvalidParams,
            ),
        ];

        for (request, expected) in cases {
            handler
                .handle_frame(&serde_json::to_string(&request).unwrap())
                .await;
            assert_eq!(
                reply(receiver.recv().await.unwrap()),
                CommandReply::failed(CMD_GUESS, expected)
            );
        }

        handler
            .handle_frame(r#"{"cmd":"guess","id":"x","roomId":"y","data":"five"}"#)
            .await;
        assert_eq!(
            reply(receiver.recv().await.unwrap()),
            CommandReply::failed(CMD_GUESS, ErrorItem::InvalidParams)
        );
    }
}

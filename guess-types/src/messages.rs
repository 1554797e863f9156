use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ErrorItem, GameResult, Ranking, RoomId};

pub const CMD_JOIN: &str = "join";
pub const CMD_GUESS: &str = "guess";

pub const REPLY_WAITING: &str = "waiting";
pub const REPLY_GUESS_RECEIVED: &str = "guessReceived";

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// Every client frame is first read as an envelope to find its command.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommandEnvelope {
    pub cmd: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JoinRequest {
    pub cmd: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GuessRequest {
    pub cmd: String,
    pub id: String,
    pub room_id: String,
    #[ts(type = "number")]
    pub data: i64,
}

impl JoinRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            cmd: CMD_JOIN.to_string(),
            id: id.into(),
        }
    }
}

impl GuessRequest {
    pub fn new(id: impl Into<String>, room_id: impl Into<String>, data: i64) -> Self {
        Self {
            cmd: CMD_GUESS.to_string(),
            id: id.into(),
            room_id: room_id.into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Synchronous answer to a client command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommandReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<ErrorItem>,
}

impl CommandReply {
    pub fn ok(cmd: &str, reply: &str) -> Self {
        Self {
            cmd: Some(cmd.to_string()),
            reply: Some(reply.to_string()),
            error: None,
        }
    }

    pub fn failed(cmd: &str, error: ErrorItem) -> Self {
        Self {
            cmd: Some(cmd.to_string()),
            reply: None,
            error: Some(error),
        }
    }

    /// Reply to a frame that could not be read as a command at all.
    pub fn invalid_request() -> Self {
        Self {
            cmd: None,
            reply: None,
            error: Some(ErrorItem::InvalidRequest),
        }
    }
}

/// Unsolicited events pushed to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "camelCase")]
#[ts(export)]
pub enum ServerEvent {
    JoinedRoom {
        room: RoomId,
    },
    GameOver {
        #[ts(type = "number")]
        secret: i64,
        rankings: Vec<Ranking>,
    },
}

impl From<&GameResult> for ServerEvent {
    fn from(result: &GameResult) -> Self {
        ServerEvent::GameOver {
            secret: result.secret,
            rankings: result.rankings.clone(),
        }
    }
}

/// Anything written to a WebSocket session. Events are tried first when
/// decoding since every reply field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum ServerMessage {
    Event(ServerEvent),
    Reply(CommandReply),
}

impl From<CommandReply> for ServerMessage {
    fn from(reply: CommandReply) -> Self {
        ServerMessage::Reply(reply)
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        ServerMessage::Event(event)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterRequest {
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatsResponse {
    #[ts(type = "number")]
    pub registered_players: usize,
    pub active_rooms: Vec<crate::ActiveRoom>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_exported_numbers_are_plain_numbers() {
        let decls = [
            crate::Player::decl(),
            crate::RoomResults::decl(),
            StatsResponse::decl(),
        ];
        for decl in decls {
            assert!(!decl.contains("bigint"), "{}", decl);
        }
        assert!(crate::RoomResults::decl().contains("guessesReceived: number"));
    }

    #[test]
    fn test_reply_omits_empty_fields() {
        let json = serde_json::to_string(&ServerMessage::from(CommandReply::ok(
            CMD_JOIN,
            REPLY_WAITING,
        )))
        .unwrap();
        assert_eq!(json, r#"{"cmd":"join","reply":"waiting"}"#);

        let json =
            serde_json::to_string(&ServerMessage::from(CommandReply::invalid_request())).unwrap();
        assert_eq!(json, r#"{"error":"INVALID_REQUEST"}"#);
    }

    #[test]
    fn test_failed_reply_carries_error_item() {
        let json = serde_json::to_string(&CommandReply::failed(CMD_GUESS, ErrorItem::NotInRoom))
            .unwrap();
        assert_eq!(json, r#"{"cmd":"guess","error":"NOT_IN_ROOM"}"#);
    }

    #[test]
    fn test_joined_room_event_shape() {
        let room = Uuid::new_v4();
        let value =
            serde_json::to_value(ServerMessage::from(ServerEvent::JoinedRoom { room })).unwrap();
        assert_eq!(value["event"], "joinedRoom");
        assert_eq!(value["room"], room.to_string());
    }

    #[test]
    fn test_events_and_replies_decode_to_the_right_variant() {
        let event: ServerMessage =
            serde_json::from_str(r#"{"event":"gameOver","secret":3,"rankings":[]}"#).unwrap();
        assert!(matches!(
            event,
            ServerMessage::Event(ServerEvent::GameOver { secret: 3, .. })
        ));

        let reply: ServerMessage =
            serde_json::from_str(r#"{"cmd":"guess","reply":"guessReceived"}"#).unwrap();
        assert_eq!(
            reply,
            ServerMessage::Reply(CommandReply::ok(CMD_GUESS, REPLY_GUESS_RECEIVED))
        );
    }

    #[test]
    fn test_guess_request_uses_room_id_key() {
        let request: GuessRequest =
            serde_json::from_str(r#"{"cmd":"guess","id":"a","roomId":"b","data":7}"#).unwrap();
        assert_eq!(request.room_id, "b");
        assert_eq!(request.data, 7);
    }
}

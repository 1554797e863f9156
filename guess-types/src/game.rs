use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{PlayerId, RoomId};

/// Players per room.
pub const ROOM_SIZE: usize = 3;

/// Inclusive bounds of a room secret.
pub const SECRET_MIN: i64 = 1;
pub const SECRET_MAX: i64 = 10;

/// Trophies awarded by rank: 1st, 2nd, 3rd.
pub const WINNER_PRIZE: i32 = 30;
pub const SECOND_PRIZE: i32 = 20;
pub const LOSER_PRIZE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum RoomState {
    AwaitingGuesses, // Waiting for all three members to guess
    Scored,          // Terminal, rankings assigned
}

/// One line of a finished room's ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ranking {
    pub player: PlayerId,
    pub rank: u8,
    #[ts(type = "number")]
    pub guess: i64,
    pub delta_trophy: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GameResult {
    pub room_id: RoomId,
    #[ts(type = "number")]
    pub secret: i64,
    /// Ordered by ascending rank.
    pub rankings: Vec<Ranking>,
}

/// Room as listed by the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ActiveRoom {
    pub id: RoomId,
    #[ts(type = "number")]
    pub secret: i64,
}

/// Snapshot returned by the room results read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoomResults {
    pub room_id: RoomId,
    pub state: RoomState,
    #[ts(type = "number")]
    pub guesses_received: usize,
    pub result: Option<GameResult>,
}

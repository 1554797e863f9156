use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::PlayerId;

/// Guess value meaning "this player has not guessed yet".
pub const UNGUESSED: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    /// Trophy delta from the player's most recently scored room.
    pub score: i32,
    /// Latest guess, or [`UNGUESSED`].
    #[ts(type = "number")]
    pub guess: i64,
    /// Distance between `guess` and the room secret. Only meaningful after guessing.
    #[ts(type = "number")]
    pub diff: u64,
    /// 1..=3 once scored, 0 before.
    pub rank: u8,
}

impl Player {
    pub fn new(id: PlayerId, nickname: String) -> Self {
        Self {
            id,
            nickname,
            score: 0,
            guess: UNGUESSED,
            diff: 0,
            rank: 0,
        }
    }

    pub fn has_guessed(&self) -> bool {
        self.guess != UNGUESSED
    }

    /// Clears per-room fields when the player is placed into a fresh room.
    pub fn reset_for_new_room(&mut self) {
        self.guess = UNGUESSED;
        self.diff = 0;
        self.rank = 0;
    }
}

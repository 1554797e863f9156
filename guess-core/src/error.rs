//! Domain errors for registration, joining and guessing.

use guess_types::{ErrorItem, PlayerId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No player is registered under this id. Holds the id as the client
    /// sent it, which need not be a valid UUID.
    #[error("player {0} is not registered")]
    NotRegistered(String),

    /// No room exists under this id.
    #[error("room {0} not found")]
    RoomNotFound(String),

    #[error("player {player} is not in room {room}")]
    NotInRoom { player: PlayerId, room: RoomId },

    /// The submitted value collides with the "not guessed" sentinel.
    #[error("guess value {0} is reserved")]
    ReservedGuess(i64),

    /// A room was built from a group that breaks the room shape.
    #[error("invalid room: {0}")]
    InvalidRoom(String),
}

impl GameError {
    /// Error item reported to the client for this failure.
    pub fn item(&self) -> ErrorItem {
        match self {
            GameError::NotRegistered(_) => ErrorItem::NotRegistered,
            GameError::RoomNotFound(_) => ErrorItem::NotFoundError,
            GameError::NotInRoom { .. } => ErrorItem::NotInRoom,
            GameError::ReservedGuess(_) | GameError::InvalidRoom(_) => ErrorItem::InvalidParams,
        }
    }
}

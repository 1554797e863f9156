pub mod errors;
pub mod game;
pub mod messages;
pub mod player;

// Re-export all types
pub use errors::*;
pub use game::*;
pub use messages::*;
pub use player::*;

pub type PlayerId = uuid::Uuid;
pub type RoomId = uuid::Uuid;

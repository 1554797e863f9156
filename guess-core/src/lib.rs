pub mod error;
pub mod ranking;
pub mod room;
pub mod secret;

// Re-export main components
pub use error::*;
pub use ranking::*;
pub use room::*;
pub use secret::*;

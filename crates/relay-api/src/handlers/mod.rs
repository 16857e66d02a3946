//! API request handlers.

pub mod chat_state;
pub mod health;
pub mod messages;
pub mod session;

pub use chat_state::*;
pub use health::*;
pub use messages::*;
pub use session::*;

pub mod constants;
pub mod error;
pub mod message;
pub mod status;

pub use constants::*;
pub use error::{RealtimeError, Result};
pub use message::Message;
pub use status::{AppState, ConnectionStatus};

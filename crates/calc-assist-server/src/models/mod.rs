pub mod ask;
pub mod chat;

pub use ask::{AskRequest, RequestMode};
pub use chat::{ChatMessage, Role, Turn};

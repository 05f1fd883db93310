//! Conversation session management
//!
//! Provides file-backed, time-expiring conversation sessions with:
//! - A JSON store reloaded before every use (`store`)
//! - Session resolution and lazy expiry (`manager`)
//! - Bounded model context (`context_builder`)
//! - One-exchange-per-page history views (`pagination`)

mod context_builder;
pub mod manager;
mod pagination;
mod store;
pub mod types;

pub use context_builder::{ContextBuilder, DEFAULT_WINDOW_TURNS};
pub use manager::{ResolvedSession, SessionManager, SessionResolution};
pub use pagination::{HistoryPage, PreviewLimits};
pub use store::{SessionStore, StoreError};
pub use types::{ConversationRecord, ConversationTable, SessionId};

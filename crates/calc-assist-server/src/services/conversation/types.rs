use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::models::chat::Turn;

/// Externally visible session token: 8 lowercase hex chars from 4 random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh identifier from the thread-local CSPRNG.
    ///
    /// Collisions are not checked; a clash overwrites the older record.
    pub fn generate() -> Self {
        let bytes: [u8; 4] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stored conversation for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Creation time, serialized as epoch milliseconds under `created`
    #[serde(rename = "created", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// User/assistant turns in conversational order
    #[serde(default)]
    pub messages: Vec<Turn>,
}

impl ConversationRecord {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            messages: Vec::new(),
        }
    }

    /// Older than `retention` at `now`; the boundary itself is still live.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        now - self.created_at > retention
    }

    /// Number of complete user + assistant pairs
    pub fn exchange_count(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn push_exchange(&mut self, question: &str, answer: &str) {
        self.messages.reserve(2);
        self.messages.push(Turn::user(question));
        self.messages.push(Turn::assistant(answer));
    }
}

/// On-disk layout of the store file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationTable {
    #[serde(default)]
    pub conversations: HashMap<SessionId, ConversationRecord>,
}

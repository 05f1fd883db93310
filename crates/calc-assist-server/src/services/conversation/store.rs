use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::{ConversationRecord, ConversationTable, SessionId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{} is not a valid conversation store: {source}", path.display())]
    Corrupt { path: PathBuf, source: serde_json::Error },

    #[error("failed to encode conversation store: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// File-backed conversation store.
///
/// The JSON file is the source of truth: callers `load()` before every
/// operation that reads or mutates sessions. Reloads and append-then-flush
/// run under the same lock, so a reload never lands between an append and
/// its write.
///
/// Exchanges whose flush failed stay pending and are replayed over every
/// reload until a later flush succeeds.
pub struct SessionStore {
    path: PathBuf,
    table: RwLock<ConversationTable>,
    pending: parking_lot::Mutex<Vec<PendingExchange>>,
    /// Held by `load` and by every whole-file write
    write_lock: Mutex<()>,
}

/// An appended exchange not yet known to be on disk
#[derive(Debug, Clone)]
struct PendingExchange {
    session_id: SessionId,
    base: ConversationRecord,
    question: String,
    answer: String,
}

impl PendingExchange {
    /// Reinserts `base` first if the record is missing from `table`.
    fn apply(&self, table: &mut ConversationTable) {
        table
            .conversations
            .entry(self.session_id.clone())
            .or_insert_with(|| self.base.clone())
            .push_exchange(&self.question, &self.answer);
    }
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Initializing session store at {}", path.display());
        Self {
            path,
            table: RwLock::new(ConversationTable::default()),
            pending: parking_lot::Mutex::new(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the in-memory table with the file contents plus any pending
    /// exchanges.
    ///
    /// A missing or blank file is an empty store. On error the in-memory
    /// table is left untouched.
    pub async fn load(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut table = match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => ConversationTable::default(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No store file at {}, starting empty", self.path.display());
                ConversationTable::default()
            }
            Err(source) => {
                return Err(StoreError::Read { path: self.path.clone(), source });
            }
        };

        let pending = self.pending.lock();
        if !pending.is_empty() {
            debug!("Replaying {} unflushed exchanges over reload", pending.len());
        }
        for exchange in pending.iter() {
            exchange.apply(&mut table);
        }
        *self.table.write() = table;
        Ok(())
    }

    pub fn get(&self, session_id: &str) -> Option<ConversationRecord> {
        self.table
            .read()
            .conversations
            .get(&SessionId::from(session_id))
            .cloned()
    }

    /// Insert or overwrite a record
    pub fn put(&self, session_id: SessionId, record: ConversationRecord) {
        self.table.write().conversations.insert(session_id, record);
    }

    /// Append one user/assistant pair and flush the table.
    ///
    /// If the record vanished from the working copy since it was resolved,
    /// `base` is reinserted first. On a failed flush the exchange stays in
    /// memory and is written by the next successful flush.
    pub async fn append_and_persist(
        &self,
        session_id: &SessionId,
        base: &ConversationRecord,
        question: &str,
        answer: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let exchange = PendingExchange {
            session_id: session_id.clone(),
            base: base.clone(),
            question: question.to_string(),
            answer: answer.to_string(),
        };
        exchange.apply(&mut self.table.write());
        self.pending.lock().push(exchange);

        self.flush().await
    }

    /// Remove every record older than `retention`; returns how many went.
    pub fn sweep_expired(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut table = self.table.write();
        let before = table.conversations.len();
        table
            .conversations
            .retain(|_, record| !record.is_expired(now, retention));
        let removed = before - table.conversations.len();

        if removed > 0 {
            info!("Swept {} expired sessions", removed);
        }

        removed
    }

    /// Number of records in the working copy
    pub fn len(&self) -> usize {
        self.table.read().conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the whole table via a temp file and rename. Caller holds
    /// `write_lock`; a failed write leaves the in-memory table as it was.
    async fn flush(&self) -> Result<(), StoreError> {
        let bytes = {
            let table = self.table.read();
            serde_json::to_vec_pretty(&*table).map_err(StoreError::Encode)?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write { path: parent.to_path_buf(), source })?;
        }

        let tmp_path = self.temp_path();
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|source| StoreError::Write { path: tmp_path.clone(), source })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })?;

        // Everything pending was in the table just written
        self.pending.lock().clear();

        debug!("Persisted {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

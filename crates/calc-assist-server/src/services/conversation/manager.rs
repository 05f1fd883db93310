use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::ask::RequestMode;

use super::pagination::{HistoryPage, PreviewLimits};
use super::store::{SessionStore, StoreError};
use super::types::{ConversationRecord, SessionId};

/// A session bound to the current request
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session_id: SessionId,
    /// Snapshot taken at resolution time
    pub record: ConversationRecord,
    pub is_new: bool,
}

#[derive(Debug, Clone)]
pub enum SessionResolution {
    /// No record is read, created, or persisted
    Stateless { is_math: bool },
    Bound(ResolvedSession),
}

/// Creates, resolves and expires sessions on top of the store.
///
/// Every entry point that touches session state reloads the store and
/// sweeps expired records exactly once before looking anything up.
/// There is no per-session lock: two concurrent exchanges on the same
/// session can both read the same history and the later write wins.
pub struct SessionManager {
    store: Arc<SessionStore>,
    retention: Duration,
    preview: PreviewLimits,
}

impl SessionManager {
    pub fn new(store: Arc<SessionStore>, retention: Duration, preview: PreviewLimits) -> Self {
        Self {
            store,
            retention,
            preview,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub async fn resolve(&self, mode: &RequestMode) -> Result<SessionResolution, StoreError> {
        self.resolve_at(mode, Utc::now()).await
    }

    /// Map a classified request to a session.
    ///
    /// An empty, unknown or expired `sid` gets a freshly minted id and an
    /// empty record, held in memory until the first exchange is persisted.
    pub async fn resolve_at(
        &self,
        mode: &RequestMode,
        now: DateTime<Utc>,
    ) -> Result<SessionResolution, StoreError> {
        let requested = match mode {
            RequestMode::Stateless { is_math } => {
                return Ok(SessionResolution::Stateless { is_math: *is_math });
            }
            RequestMode::SessionBound { sid } => sid.as_str(),
        };

        self.refresh(now).await?;

        if !requested.is_empty() {
            if let Some(record) = self.store.get(requested) {
                debug!(
                    "Resumed session {} ({} exchanges)",
                    requested,
                    record.exchange_count()
                );
                return Ok(SessionResolution::Bound(ResolvedSession {
                    session_id: SessionId::from(requested),
                    record,
                    is_new: false,
                }));
            }
        }

        let session_id = SessionId::generate();
        let record = ConversationRecord::new(now);
        self.store.put(session_id.clone(), record.clone());

        if requested.is_empty() {
            info!("Created session {}", session_id);
        } else {
            info!("Session {} unknown or expired, created {}", requested, session_id);
        }

        Ok(SessionResolution::Bound(ResolvedSession {
            session_id,
            record,
            is_new: true,
        }))
    }

    /// Append the completed exchange and flush the store.
    ///
    /// If the flush fails the exchange stays visible to later requests and
    /// is written by the next successful flush.
    pub async fn record_exchange(
        &self,
        session: &ResolvedSession,
        question: &str,
        answer: &str,
    ) -> Result<(), StoreError> {
        self.store
            .append_and_persist(&session.session_id, &session.record, question, answer)
            .await
    }

    pub async fn history_page(&self, sid: &str, index: i64) -> Result<HistoryPage, StoreError> {
        self.history_page_at(sid, index, Utc::now()).await
    }

    pub async fn history_page_at(
        &self,
        sid: &str,
        index: i64,
        now: DateTime<Utc>,
    ) -> Result<HistoryPage, StoreError> {
        self.refresh(now).await?;
        let record = self.store.get(sid);
        Ok(HistoryPage::build(record.as_ref(), index, self.preview))
    }

    /// Records currently held in memory
    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    async fn refresh(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.load().await?;
        self.store.sweep_expired(now, self.retention);
        Ok(())
    }
}

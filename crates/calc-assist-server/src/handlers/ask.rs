use axum::extract::{Query, State};
use std::sync::Arc;
use tracing::debug;

use crate::models::ask::{AskRequest, HistoryQuery};
use crate::services::conversation::SessionManager;
use crate::services::AskService;
use crate::utils::error::ApiError;

pub async fn ask_handler(
    State(ask_service): State<Arc<AskService>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<String, ApiError> {
    let request = AskRequest::from_query(&pairs)?;
    debug!(
        "Ask request: mode={:?}, question_len={}",
        request.mode,
        request.question.len()
    );

    ask_service.ask(request).await
}

/// History pages are always 200 except for a missing `sid`; unknown
/// sessions and out-of-range pages come back as sentinel bodies.
pub async fn history_handler(
    State(sessions): State<Arc<SessionManager>>,
    Query(query): Query<HistoryQuery>,
) -> Result<String, ApiError> {
    let sid = query
        .sid
        .as_deref()
        .filter(|sid| !sid.is_empty())
        .ok_or_else(|| ApiError::BadRequest("NO SESSION".to_string()))?;

    let page = sessions.history_page(sid, query.page()).await?;
    Ok(page.to_string())
}

use std::sync::Arc;
use tracing::{error, info};

use crate::config::PromptsConfig;
use crate::models::ask::AskRequest;
use crate::models::chat::ChatMessage;
use crate::services::conversation::{ContextBuilder, SessionManager, SessionResolution};
use crate::services::llm_service::LlmProvider;
use crate::utils::error::ApiError;

/// Fallback body for a stateless answer with no text
pub const STATELESS_FALLBACK: &str = "no response";
/// Fallback answer recorded in a session when the model returns no text
pub const SESSION_FALLBACK: &str = "NO RESPONSE";

/// Answers `/ask` questions, stateless or within a session.
pub struct AskService {
    llm: Arc<dyn LlmProvider>,
    sessions: Arc<SessionManager>,
    context_builder: ContextBuilder,
    prompts: PromptsConfig,
}

impl AskService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        sessions: Arc<SessionManager>,
        context_builder: ContextBuilder,
        prompts: PromptsConfig,
    ) -> Self {
        Self {
            llm,
            sessions,
            context_builder,
            prompts,
        }
    }

    /// Returns the response body: the raw answer for stateless questions,
    /// `{sessionId}|{answer}` for session-bound ones.
    pub async fn ask(&self, request: AskRequest) -> Result<String, ApiError> {
        match self.sessions.resolve(&request.mode).await? {
            SessionResolution::Stateless { is_math } => {
                let system_prompt = if is_math {
                    &self.prompts.math_system_prompt
                } else {
                    &self.prompts.general_system_prompt
                };
                let messages = [
                    ChatMessage::system(system_prompt.as_str()),
                    ChatMessage::user(request.question.as_str()),
                ];

                let answer = self.complete(&messages).await?;
                Ok(answer.unwrap_or_else(|| STATELESS_FALLBACK.to_string()))
            }
            SessionResolution::Bound(session) => {
                let messages = self.context_builder.build_messages(
                    &self.prompts.general_system_prompt,
                    &session.record.messages,
                    &request.question,
                );

                let answer = self
                    .complete(&messages)
                    .await?
                    .unwrap_or_else(|| SESSION_FALLBACK.to_string());

                self.sessions
                    .record_exchange(&session, &request.question, &answer)
                    .await?;

                info!(
                    "Session {} answered (new={}, exchanges={})",
                    session.session_id,
                    session.is_new,
                    session.record.exchange_count() + 1
                );

                Ok(format!("{}|{}", session.session_id, answer))
            }
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, ApiError> {
        self.llm.complete(messages).await.map_err(|e| {
            error!("Completion failed: {:#}", e);
            ApiError::LlmError(e.to_string())
        })
    }
}

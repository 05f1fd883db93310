use std::sync::Arc;
use axum::extract::FromRef;

use crate::config::Settings;
use crate::services::conversation::{ContextBuilder, PreviewLimits, SessionManager, SessionStore};
use crate::services::{AskService, FirmwareStore, LlmProvider, MathService, VisionService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionManager>,
    pub ask_service: Arc<AskService>,
    pub vision_service: Arc<VisionService>,
    pub math_service: Arc<MathService>,
    pub firmware_store: Arc<FirmwareStore>,
}

impl AppState {
    /// Wire every service from settings around one completion backend.
    pub fn new(settings: Settings, llm: Arc<dyn LlmProvider>) -> Self {
        let store = Arc::new(SessionStore::new(settings.sessions.store_path.clone()));
        let sessions = Arc::new(SessionManager::new(
            store,
            settings.retention(),
            PreviewLimits {
                question_chars: settings.sessions.question_preview_chars,
                answer_chars: settings.sessions.answer_preview_chars,
            },
        ));

        let ask_service = Arc::new(AskService::new(
            llm.clone(),
            sessions.clone(),
            ContextBuilder::new(settings.sessions.context_window_turns),
            settings.prompts.clone(),
        ));

        let vision_service = Arc::new(VisionService::new(
            llm,
            settings.prompts.vision_system_prompt.clone(),
        ));

        Self {
            sessions,
            ask_service,
            vision_service,
            math_service: Arc::new(MathService::new(settings.math.clone())),
            firmware_store: Arc::new(FirmwareStore::new(settings.firmware.clone())),
            settings: Arc::new(settings),
        }
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<AskService> {
    fn from_ref(state: &AppState) -> Self {
        state.ask_service.clone()
    }
}

impl FromRef<AppState> for Arc<VisionService> {
    fn from_ref(state: &AppState) -> Self {
        state.vision_service.clone()
    }
}

impl FromRef<AppState> for Arc<MathService> {
    fn from_ref(state: &AppState) -> Self {
        state.math_service.clone()
    }
}

impl FromRef<AppState> for Arc<FirmwareStore> {
    fn from_ref(state: &AppState) -> Self {
        state.firmware_store.clone()
    }
}

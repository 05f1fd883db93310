use tracing::debug;

use crate::models::chat::{ChatMessage, Turn};

/// Default number of stored turns replayed into a completion call (5 exchanges)
pub const DEFAULT_WINDOW_TURNS: usize = 10;

/// Builds the bounded message list sent to the completion API.
///
/// Older turns beyond the window are dropped, never summarized.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    window_turns: usize,
}

impl ContextBuilder {
    pub fn new(window_turns: usize) -> Self {
        Self { window_turns }
    }

    /// The most recent `window_turns` turns of `history`, in original order.
    pub fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        let start = history.len().saturating_sub(self.window_turns);
        &history[start..]
    }

    /// System instruction, then the history window, then the new question.
    pub fn build_messages(
        &self,
        system_prompt: &str,
        history: &[Turn],
        question: &str,
    ) -> Vec<ChatMessage> {
        let window = self.window(history);
        debug!(
            "Building context: {} of {} stored turns",
            window.len(),
            history.len()
        );

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(window.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(question));
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_TURNS)
    }
}

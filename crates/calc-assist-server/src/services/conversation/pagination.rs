use std::fmt;

use super::types::ConversationRecord;

/// Display limits for one history page on the calculator screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewLimits {
    pub question_chars: usize,
    pub answer_chars: usize,
}

impl Default for PreviewLimits {
    fn default() -> Self {
        Self {
            question_chars: 80,
            answer_chars: 150,
        }
    }
}

/// One page of stored history, one exchange per page.
///
/// Missing sessions and out-of-range pages are ordinary results, rendered
/// as sentinel bodies rather than errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryPage {
    NoHistory,
    NoMore {
        index: i64,
        total: usize,
    },
    Exchange {
        index: usize,
        total: usize,
        question: String,
        answer: String,
    },
}

impl HistoryPage {
    pub fn build(record: Option<&ConversationRecord>, index: i64, limits: PreviewLimits) -> Self {
        let Some(record) = record else {
            return Self::NoHistory;
        };

        let total = record.exchange_count();
        let Some(page) = usize::try_from(index).ok().filter(|&i| i < total) else {
            return Self::NoMore { index, total };
        };

        let question = &record.messages[page * 2].content;
        let answer = &record.messages[page * 2 + 1].content;

        Self::Exchange {
            index: page,
            total,
            question: truncate_chars(question, limits.question_chars),
            answer: truncate_chars(answer, limits.answer_chars),
        }
    }
}

impl fmt::Display for HistoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHistory => f.write_str("0/0|NO HISTORY"),
            Self::NoMore { index, total } => write!(f, "{index}/{total}|NO MORE"),
            Self::Exchange { index, total, question, answer } => {
                write!(f, "{index}/{total}|Q:{question} A:{answer}")
            }
        }
    }
}

/// Prefix cut by characters, not bytes and not word-aware
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

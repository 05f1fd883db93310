use serde::Deserialize;

use crate::utils::error::ApiError;

/// How a question is handled, decided once from the query string.
///
/// Presence of `sid` (even empty) selects session mode; `math` only matters
/// for stateless questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    Stateless { is_math: bool },
    SessionBound { sid: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    pub mode: RequestMode,
}

impl AskRequest {
    /// Classify raw `/ask` query pairs.
    ///
    /// Repeated `question` keys and bracketed `question[]` keys are array
    /// parameters and rejected.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut questions = pairs
            .iter()
            .filter(|(key, _)| key == "question" || key.starts_with("question["));

        let question = match (questions.next(), questions.next()) {
            (Some((key, value)), None) if key == "question" => value.clone(),
            (None, _) => return Err(ApiError::BadRequest("missing question".to_string())),
            _ => return Err(ApiError::BadRequest("question must be a single value".to_string())),
        };

        let sid = pairs
            .iter()
            .find(|(key, _)| key == "sid")
            .map(|(_, value)| value.clone());

        let mode = match sid {
            Some(sid) => RequestMode::SessionBound { sid },
            None => RequestMode::Stateless {
                is_math: pairs.iter().any(|(key, _)| key == "math"),
            },
        };

        Ok(Self { question, mode })
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub sid: Option<String>,
    pub p: Option<String>,
}

impl HistoryQuery {
    /// Page index; absent or unparseable values fall back to the first page.
    pub fn page(&self) -> i64 {
        self.p
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct SolveQuery {
    pub n: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExpressionQuery {
    pub expr: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub version: Option<String>,
}

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use image::ImageFormat;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::chat::{ChatMessage, ContentPart, ImageUrl, MessageContent, Role};
use crate::services::ask_service::STATELESS_FALLBACK;
use crate::services::llm_service::LlmProvider;
use crate::utils::error::ApiError;

const ANSWER_INSTRUCTIONS: &str =
    "Do not explain how you found the answer. If the question is multiple-choice, give the letter answer.";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode JPEG: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to re-encode JPEG: {0}")]
    Encode(#[source] image::ImageError),

    #[error("image worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Decode, re-encode and base64 a JPEG on the blocking pool.
pub async fn encode_jpeg_base64(raw: Bytes) -> Result<String, ImageError> {
    tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory_with_format(&raw, ImageFormat::Jpeg)
            .map_err(ImageError::Decode)?;

        let mut encoded = Cursor::new(Vec::new());
        decoded
            .write_to(&mut encoded, ImageFormat::Jpeg)
            .map_err(ImageError::Encode)?;

        Ok(BASE64.encode(encoded.into_inner()))
    })
    .await?
}

/// Question text for an optional question number on the photographed page
pub fn question_prompt(question_number: Option<&str>) -> String {
    match question_number.filter(|n| !n.is_empty()) {
        Some(n) => format!("What is the answer to question {n}?"),
        None => "What is the answer to this question?".to_string(),
    }
}

/// Answers a math question photographed by the device.
pub struct VisionService {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
}

impl VisionService {
    pub fn new(llm: Arc<dyn LlmProvider>, system_prompt: String) -> Self {
        Self { llm, system_prompt }
    }

    pub async fn solve(&self, jpeg: Bytes, question_number: Option<&str>) -> Result<String, ApiError> {
        let received = jpeg.len();
        let encoded = encode_jpeg_base64(jpeg).await?;
        info!("Encoded image: {} bytes in, {} base64 chars", received, encoded.len());

        let question = question_prompt(question_number);
        debug!("Vision prompt: {}", question);

        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage {
                role: Role::User,
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: format!("{question} {ANSWER_INSTRUCTIONS}"),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{encoded}"),
                            detail: "high".to_string(),
                        },
                    },
                ]),
            },
        ];

        let answer = self.llm.complete(&messages).await.map_err(|e| {
            error!("Vision completion failed: {:#}", e);
            ApiError::LlmError(e.to_string())
        })?;

        Ok(answer.unwrap_or_else(|| STATELESS_FALLBACK.to_string()))
    }
}

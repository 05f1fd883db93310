use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub sessions: SessionConfig,
    pub prompts: PromptsConfig,
    pub math: MathConfig,
    pub firmware: FirmwareConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for raw request bodies (images, firmware uploads)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4.1-nano".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file backing the conversation store
    pub store_path: PathBuf,
    pub retention_hours: i64,
    /// Stored turns replayed into each completion call
    pub context_window_turns: usize,
    pub question_preview_chars: usize,
    pub answer_preview_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("db.json"),
            retention_hours: 24,
            context_window_turns: 10,
            question_preview_chars: 80,
            answer_preview_chars: 150,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PromptsConfig {
    pub general_system_prompt: String,
    pub math_system_prompt: String,
    pub vision_system_prompt: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            general_system_prompt: "You are answering questions on a TI-84 calculator. Keep responses under 100 characters, use UPPERCASE letters only. NEVER use LaTeX, backslashes, or curly braces. Write fractions as A/B, exponents as X^N, pi as PI, sqrt as SQRT().".to_string(),
            math_system_prompt: "You are a precise math solver for a TI-84 calculator. Compute the EXACT answer. Show ONLY the final numerical result or simplified expression. Use UPPERCASE. NEVER use LaTeX, backslashes, or curly braces. Write fractions as A/B, exponents as X^N, pi as PI, sqrt as SQRT(). Keep under 200 characters.".to_string(),
            vision_system_prompt: "You are a helpful math tutor, specifically designed to help with basic arithmetic, but also can answer a broad range of math questions from uploaded images. You should provide answers as succinctly as possible, and always under 100 characters. Be as accurate as possible.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MathConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newton.vercel.app/api/v2".to_string(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FirmwareConfig {
    pub directory: PathBuf,
    pub default_version: String,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("firmware"),
            default_version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    /// When set, logs are also written to a daily rolling file here
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: true,
            directory: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        if settings.llm.api_key.is_none() {
            settings.llm.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        Ok(settings)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sessions.retention_hours)
    }
}

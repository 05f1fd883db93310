pub mod settings;

pub use settings::{
    FirmwareConfig, LlmConfig, LoggingConfig, MathConfig, PromptsConfig, ServerConfig,
    SessionConfig, Settings,
};

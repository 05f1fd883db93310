pub mod ask_service;
pub mod conversation;
pub mod firmware_store;
pub mod llm_service;
pub mod math_service;
pub mod vision;

pub use ask_service::AskService;
pub use firmware_store::FirmwareStore;
pub use llm_service::{LlmProvider, LlmService};
pub use math_service::{MathOperation, MathService};
pub use vision::VisionService;

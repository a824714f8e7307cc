pub mod error;
pub mod gemini;
pub mod image;
pub mod prompts;
pub mod provider;

pub use error::{AssistantError, AssistantResult};
pub use gemini::GeminiClient;
pub use image::{decode_data_url, InlineImage};
pub use provider::AssistantProvider;

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for the hosted model
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

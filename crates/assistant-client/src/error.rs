use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Assistant not configured: {0}")]
    NotConfigured(String),

    #[error("Model API error: {0}")]
    Api(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Invalid image format: {0}")]
    InvalidImage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AssistantError {
    /// Errors caused by the caller's input rather than the backend
    pub fn is_client_error(&self) -> bool {
        matches!(self, AssistantError::InvalidImage(_))
    }
}

pub type AssistantResult<T> = Result<T, AssistantError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgriError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StabilityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Probe failure: {reason}")]
    Probe { reason: String },

    #[error("Metrics registry error: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, StabilityError>;

use thiserror::Error;

/// Shared error type for Faultline configuration and serialization.
#[derive(Error, Debug)]
pub enum FaultlineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

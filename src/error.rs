//! Stage worker error types

use thiserror::Error;

/// Error type for stage worker operations
#[derive(Error, Debug)]
pub enum PipestageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PipestageError
pub type Result<T> = std::result::Result<T, PipestageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipestageError::Transport("intake channel closed".to_string());
        assert_eq!(err.to_string(), "Transport error: intake channel closed");

        let err = PipestageError::Processing("unit panicked on frame 3".to_string());
        assert!(err.to_string().starts_with("Processing error:"));
    }
}

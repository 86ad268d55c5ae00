//! Error types for portfolio-agent

use thiserror::Error;

/// Result type alias for portfolio-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the agent runtime
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable credential material was found.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The streamed response could not be turned into an answer.
    #[error("Sorry, I could not understand the agent's response: {0}")]
    Decode(String),

    #[error("Action error: {0}")]
    Action(String),

    #[error("Unrecognized api path: {0}")]
    UnrecognizedRoute(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_carries_apology() {
        let err = Error::Decode("finalResponse not found".to_string());
        let text = err.to_string();
        assert!(text.starts_with("Sorry"));
        assert!(text.contains("finalResponse not found"));
    }

    #[test]
    fn test_auth_error_display() {
        let err = Error::Auth("no credentials".to_string());
        assert_eq!(err.to_string(), "Authentication error: no credentials");
    }
}

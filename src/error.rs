use thiserror::Error;

/// Every failure the reader can surface. The app shows `to_string()` of the
/// latest one and keeps going.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoachError {
    /// Bad credentials or a rejected registration.
    #[error("{0}")]
    Auth(String),

    /// Non-2xx or non-JSON answer from any service.
    #[error("{0}")]
    Transport(String),

    /// The lookup request failed or came back malformed.
    #[error("{0}")]
    Lookup(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type CoachResult<T> = Result<T, CoachError>;

impl From<reqwest::Error> for CoachError {
    fn from(e: reqwest::Error) -> Self {
        CoachError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for CoachError {
    fn from(e: serde_json::Error) -> Self {
        CoachError::Transport(format!("Invalid JSON: {}", e))
    }
}

impl From<std::io::Error> for CoachError {
    fn from(e: std::io::Error) -> Self {
        CoachError::Store(e.to_string())
    }
}

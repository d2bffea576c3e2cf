//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Telegram gateway error: {0}")]
    TgGateway(String),

    /// FloodWait error: the platform asks us to wait `seconds` before retrying.
    #[error("FloodWait: retry after {seconds} seconds")]
    FloodWait { seconds: u64 },

    #[error("a forward job is already running for user {owner}")]
    AlreadyRunning { owner: i64 },

    #[error("invalid job options: {0}")]
    InvalidOptions(String),

    #[error("Caption classification failed: {0}")]
    Classification(String),

    #[error("Metadata lookup failed: {0}")]
    Metadata(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("UI error: {0}")]
    Ui(String),

    #[error("forward job aborted: {0}")]
    JobAborted(String),
}

impl DomainError {
    /// Seconds to wait when this is a rate-limit signal.
    pub fn flood_wait_secs(&self) -> Option<u64> {
        match self {
            DomainError::FloodWait { seconds } => Some(*seconds),
            _ => None,
        }
    }
}

use thiserror::Error;

/// Server-side connection admission and lifecycle errors.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("connection limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("connection timed out: {0}")]
    Timeout(String),

    #[error("invalid connection state: {0}")]
    InvalidState(String),
}

impl ConnectionError {
    pub fn limit_exceeded(details: impl Into<String>) -> Self {
        Self::LimitExceeded(details.into())
    }

    pub fn timeout(details: impl Into<String>) -> Self {
        Self::Timeout(details.into())
    }

    pub fn invalid_state(details: impl Into<String>) -> Self {
        Self::InvalidState(details.into())
    }
}

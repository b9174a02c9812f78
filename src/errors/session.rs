use thiserror::Error;

use super::{ConfigValidationError, ExceptionCode, FrameError};

/// Errors surfaced to an application calling the client session.
///
/// Validation errors never touch the wire; transport errors invalidate
/// the session and a reconnect attempt begins automatically; protocol
/// exceptions do not invalidate the session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not connected")]
    NotConnected,

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    #[error("protocol exception: {0}")]
    ProtocolException(ExceptionCode),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigValidationError),
}

impl SessionError {
    pub fn invalid_argument(details: impl Into<String>) -> Self {
        Self::InvalidArgument(details.into())
    }

    pub fn connection_lost(details: impl Into<String>) -> Self {
        Self::ConnectionLost(details.into())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::ConnectionLost(err.to_string())
    }
}

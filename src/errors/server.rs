use thiserror::Error;

use super::{ConfigValidationError, ConnectionError, FrameError};

/// Errors surfaced by the server dispatcher's own plumbing. Per-request
/// protocol failures are turned into exception PDUs rather than raised
/// here — this enum covers what happens around that, not the
/// Modbus-level request/response exchange itself.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigValidationError),
}

use thiserror::Error;

/// OS-level failure from a serial platform shim (e.g. the Linux RS-485
/// RTS ioctl). Never raised on non-Linux targets or when the `rs485`
/// feature is off.
#[derive(Error, Debug)]
#[error("platform error (errno {errno}): {message}")]
pub struct PlatformError {
    pub errno: i32,
    pub message: String,
}

impl PlatformError {
    pub fn last_os_error(message: impl Into<String>) -> Self {
        let err = std::io::Error::last_os_error();
        Self {
            errno: err.raw_os_error().unwrap_or(-1),
            message: message.into(),
        }
    }
}

mod config;
mod connection;
mod frame;
mod kinds;
mod platform;
mod server;
mod session;

pub use config::ConfigValidationError;
pub use connection::ConnectionError;
pub use frame::FrameError;
pub use kinds::{ExceptionCode, FrameFormatKind, FrameSizeKind};
pub use platform::PlatformError;
pub use server::ServerError;
pub use session::SessionError;

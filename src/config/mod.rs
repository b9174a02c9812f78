mod app;
mod client;
mod connection;
mod http;
mod logging;
mod serial;
mod server;
mod types;

pub use app::AppConfig;
pub use client::{ClientConfig, ClientTransportConfig};
pub use connection::ConnectionConfig;
pub use http::Config as HttpConfig;
pub use logging::Config as LoggingConfig;
pub use serial::SerialPortConfig;
pub use server::{ServerConfig, ServerTransportConfig};
pub use types::{DataBits, Handshake, Parity, RtsType, StopBits};

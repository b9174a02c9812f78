pub mod address_space;
pub mod client;
pub mod config;
pub mod connection;
pub mod errors;
pub mod http_api;
pub mod logging;
pub mod platform;
pub mod proto;
pub mod server;
mod utils;

pub use address_space::{BitTable, Device, Devices, RegisterTable, WriteEvent, WriteKind};
pub use client::{ConnectionState, QueueHandle, ReconnectPolicy, SerialSession, TcpSession};
pub use config::{AppConfig, ClientConfig, ClientTransportConfig, ConnectionConfig, HttpConfig, LoggingConfig};
pub use config::{DataBits, Handshake, Parity, RtsType, SerialPortConfig, StopBits};
pub use config::{ServerConfig, ServerTransportConfig};
pub use connection::{ClientStats, ConnectionGuard, ConnectionManager, ConnectionStats, IpStats};
pub use errors::{
    ConfigValidationError, ConnectionError, ExceptionCode, FrameError, FrameFormatKind,
    FrameSizeKind, PlatformError, ServerError, SessionError,
};
pub use http_api::start_http_server;
pub use logging::setup_logging;
pub use proto::pdu::{Request, Response};
pub use server::{dispatch, serve_rtu_over_tcp, serve_serial, serve_tcp, Dispatch};
pub use utils::generate_request_id;

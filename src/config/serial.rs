use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::SerialPort;

use super::types::{DataBits, Handshake, Parity, RtsType, StopBits};
use crate::errors::ConfigValidationError;

/// Serial port parameters shared by the RTU client and the RTU server.
/// Default baud is 38400 8N1 — deliberately not the classic Modbus 8E1
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SerialPortConfig {
    pub port_name: String,
    pub baud: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub handshake: Handshake,

    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub receive_timeout: Duration,

    pub buffer_size: usize,

    pub rts_type: RtsType,
    pub rts_delay_us: u64,
}

impl Default for SerialPortConfig {
    fn default() -> Self {
        Self {
            port_name: "/dev/ttyUSB0".to_string(),
            baud: 38_400,
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            handshake: Handshake::default(),
            send_timeout: Duration::from_secs(1),
            receive_timeout: Duration::from_secs(1),
            buffer_size: 4096,
            rts_type: RtsType::default(),
            rts_delay_us: 3500,
        }
    }
}

impl SerialPortConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.port_name.is_empty() {
            return Err(ConfigValidationError::transport("serial port_name must not be empty"));
        }
        if self.baud == 0 {
            return Err(ConfigValidationError::transport("baud rate must be non-zero"));
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigValidationError::transport("send_timeout must be non-zero"));
        }
        if self.receive_timeout.is_zero() {
            return Err(ConfigValidationError::transport("receive_timeout must be non-zero"));
        }
        if self.buffer_size == 0 {
            return Err(ConfigValidationError::transport("buffer_size must be non-zero"));
        }
        Ok(())
    }

    /// Opens the configured serial port via `open_native`, which returns
    /// the concrete platform type (`TTYPort`/`COMPort`) rather than the
    /// object-safe `SerialPort` trait object `serialport::new(..).open()`
    /// gives back — the concrete type is `Send`, the boxed trait object
    /// alone is not guaranteed to be.
    pub fn open(&self) -> Result<Box<dyn SerialPort + Send>, serialport::Error> {
        let port = serialport::new(&self.port_name, self.baud)
            .data_bits(self.data_bits.into())
            .stop_bits(self.stop_bits.into())
            .parity(self.parity.into())
            .flow_control(self.handshake.into())
            .timeout(self.receive_timeout)
            .open_native()?;
        Ok(Box::new(port))
    }

    pub fn describe(&self) -> String {
        format!(
            "{} ({} baud, {} data bits, {} parity, {} stop bits, handshake={})",
            self.port_name, self.baud, self.data_bits, self.parity, self.stop_bits, self.handshake
        )
    }
}

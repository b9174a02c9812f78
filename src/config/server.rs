use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SerialPortConfig;
use crate::errors::ConfigValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerTransportConfig {
    Tcp { bind_addr: String, port: u16 },
    RtuOverTcp { bind_addr: String, port: u16 },
    Rtu(SerialPortConfig),
}

impl Default for ServerTransportConfig {
    fn default() -> Self {
        Self::Tcp {
            bind_addr: "0.0.0.0".to_string(),
            port: 502,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub transport: ServerTransportConfig,

    #[serde(with = "humantime_serde")]
    pub per_connection_idle_timeout: Duration,

    /// Unit ids this server answers for; a frame addressed to any other
    /// unit id is dropped on RTU, or answered with exception 0x0B on
    /// TCP.
    pub unit_ids: Vec<u8>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransportConfig::default(),
            per_connection_idle_timeout: Duration::from_secs(3),
            unit_ids: vec![1],
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match &self.transport {
            ServerTransportConfig::Tcp { bind_addr, port }
            | ServerTransportConfig::RtuOverTcp { bind_addr, port } => {
                if bind_addr.is_empty() {
                    return Err(ConfigValidationError::transport("server bind_addr must not be empty"));
                }
                if *port == 0 {
                    return Err(ConfigValidationError::transport("server port must be non-zero"));
                }
            }
            ServerTransportConfig::Rtu(serial) => serial.validate()?,
        }
        if self.per_connection_idle_timeout.is_zero() {
            return Err(ConfigValidationError::connection(
                "per_connection_idle_timeout must be non-zero",
            ));
        }
        if self.unit_ids.is_empty() {
            return Err(ConfigValidationError::address_space(
                "server must answer for at least one unit id",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        ServerConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_unit_ids_is_rejected() {
        let mut config = ServerConfig::default();
        config.unit_ids.clear();
        assert!(config.validate().is_err());
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SerialPortConfig;
use crate::errors::ConfigValidationError;

/// Which wire the client session speaks. TCP and RTU-over-TCP share the
/// same `{host, port}` shape — they differ only in framing, selected
/// elsewhere by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientTransportConfig {
    Tcp { host: String, port: u16 },
    RtuOverTcp { host: String, port: u16 },
    Rtu(SerialPortConfig),
}

impl Default for ClientTransportConfig {
    fn default() -> Self {
        Self::Tcp {
            host: "127.0.0.1".to_string(),
            port: 502,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub transport: ClientTransportConfig,

    /// Total elapsed time budget across reconnect attempts before the
    /// session gives up and transitions to `Disconnected(Fatal)`. `None`
    /// means unbounded, the default.
    #[serde(with = "humantime_serde::option", default)]
    pub reconnect_budget: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: ClientTransportConfig::default(),
            reconnect_budget: None,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match &self.transport {
            ClientTransportConfig::Tcp { host, port } | ClientTransportConfig::RtuOverTcp { host, port } => {
                if host.is_empty() {
                    return Err(ConfigValidationError::transport("client host must not be empty"));
                }
                if *port == 0 {
                    return Err(ConfigValidationError::transport("client port must be non-zero"));
                }
            }
            ClientTransportConfig::Rtu(serial) => serial.validate()?,
        }
        if let Some(budget) = self.reconnect_budget {
            if budget.is_zero() {
                return Err(ConfigValidationError::connection(
                    "reconnect_budget, if set, must be non-zero",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        ClientConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_host_is_rejected() {
        let config = ClientConfig {
            transport: ClientTransportConfig::Tcp {
                host: String::new(),
                port: 502,
            },
            reconnect_budget: None,
        };
        assert!(config.validate().is_err());
    }
}

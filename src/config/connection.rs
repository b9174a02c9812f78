use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigValidationError;

/// TCP server admission control: concurrency limits and idle cleanup,
/// independent of the per-connection idle timeout in `ServerConfig` (that
/// one closes a connection that made no progress; this one forgets stats
/// for a peer that's been gone a while).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub max_connections: usize,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    pub per_ip_limits: Option<usize>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            idle_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            per_ip_limits: Some(10),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_connections == 0 {
            return Err(ConfigValidationError::connection("max_connections cannot be 0"));
        }
        if let Some(limit) = self.per_ip_limits {
            if limit == 0 {
                return Err(ConfigValidationError::connection("per_ip_limits cannot be 0"));
            }
            if limit > self.max_connections {
                return Err(ConfigValidationError::connection(format!(
                    "per_ip_limits ({limit}) cannot be greater than max_connections ({})",
                    self.max_connections
                )));
            }
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigValidationError::connection("idle_timeout cannot be 0"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigValidationError::connection("connect_timeout cannot be 0"));
        }
        Ok(())
    }
}

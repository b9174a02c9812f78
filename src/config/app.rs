use std::path::PathBuf;

use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{ClientConfig, ConnectionConfig, HttpConfig, LoggingConfig, ServerConfig};
use crate::errors::ConfigValidationError;

/// Top-level, typed configuration. Both a `client` and `server` section
/// are always present (each carries its own sane default); `main.rs`
/// decides which to act on based on the CLI subcommand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub connection: ConnectionConfig,
}

impl AppConfig {
    pub const CONFIG_DIR: &'static str = "config";
    const ENV_PREFIX: &'static str = "MODBUS_STATION";

    /// Builds configuration from, in ascending priority:
    /// 1. Built-in defaults
    /// 2. `config/default.yaml`
    /// 3. `config/{RUN_MODE}.yaml` (optional)
    /// 4. `config/local.yaml` (optional)
    /// 5. `MODBUS_STATION_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let built = ConfigBuilder::builder()
            .add_source(
                File::new(&format!("{}/default", Self::CONFIG_DIR), FileFormat::Yaml).required(false),
            )
            .add_source(
                File::new(&format!("{}/{}", Self::CONFIG_DIR, environment), FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                File::new(&format!("{}/local", Self::CONFIG_DIR), FileFormat::Yaml).required(false),
            )
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // No config files and no env overrides present: fall back to the
        // built-in defaults rather than failing on missing required keys.
        let config = match built.clone().try_deserialize() {
            Ok(config) => config,
            Err(_) if built.collect()?.is_empty() => Self::default(),
            Err(err) => return Err(err),
        };

        config.validate().map_err(|err| ConfigError::Message(err.to_string()))?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate().map_err(|err| ConfigError::Message(err.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.client.validate()?;
        self.server.validate()?;
        self.connection.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn file_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            r#"
            client:
              transport:
                kind: tcp
                host: "192.168.1.50"
                port: 1502
              reconnect_budget: null
            server:
              transport:
                kind: tcp
                bind_addr: "0.0.0.0"
                port: 502
              per_connection_idle_timeout: "3s"
              unit_ids: [1, 2]
            http:
              enabled: true
              bind_addr: "127.0.0.1"
              bind_port: 8081
              metrics_enabled: true
            logging:
              trace_frames: false
              level: "info"
              format: "pretty"
              include_location: false
              thread_ids: false
              thread_names: false
            connection:
              max_connections: 100
              idle_timeout: "60s"
              connect_timeout: "5s"
              per_ip_limits: 10
            "#,
        )
        .unwrap();

        let config = AppConfig::from_file(config_path).unwrap();
        assert_eq!(config.server.unit_ids, vec![1, 2]);
    }
}

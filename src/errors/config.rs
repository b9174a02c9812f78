use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("transport configuration invalid: {0}")]
    Transport(String),

    #[error("connection configuration invalid: {0}")]
    Connection(String),

    #[error("address space configuration invalid: {0}")]
    AddressSpace(String),

    #[error("configuration source error: {0}")]
    Source(String),
}

impl ConfigValidationError {
    pub fn transport(details: impl Into<String>) -> Self {
        Self::Transport(details.into())
    }

    pub fn connection(details: impl Into<String>) -> Self {
        Self::Connection(details.into())
    }

    pub fn address_space(details: impl Into<String>) -> Self {
        Self::AddressSpace(details.into())
    }

    pub fn source(details: impl Into<String>) -> Self {
        Self::Source(details.into())
    }
}

impl From<config::ConfigError> for ConfigValidationError {
    fn from(err: config::ConfigError) -> Self {
        Self::Source(err.to_string())
    }
}

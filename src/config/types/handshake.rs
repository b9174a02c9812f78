use serde::{Deserialize, Serialize};

/// Serial flow control, named `handshake` in the client/server
/// configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handshake {
    None,
    Software,
    Hardware,
}

impl From<Handshake> for serialport::FlowControl {
    fn from(handshake: Handshake) -> Self {
        match handshake {
            Handshake::None => serialport::FlowControl::None,
            Handshake::Software => serialport::FlowControl::Software,
            Handshake::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Software => write!(f, "software"),
            Self::Hardware => write!(f, "hardware"),
        }
    }
}

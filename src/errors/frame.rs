use thiserror::Error;

use super::kinds::{FrameFormatKind, FrameSizeKind};

/// A frame that failed to decode. On TCP this closes the connection; on
/// RTU the frame is dropped and the decoder resynchronizes.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame size error: {kind} ({details})")]
    Size {
        kind: FrameSizeKind,
        details: String,
    },

    #[error("frame format error: {kind} ({details})")]
    Format {
        kind: FrameFormatKind,
        details: String,
    },

    #[error("crc mismatch: calculated={calculated:04X}, received={received:04X}, frame={frame_hex}")]
    Crc {
        calculated: u16,
        received: u16,
        frame_hex: String,
    },
}

impl FrameError {
    pub fn too_short(details: impl Into<String>) -> Self {
        Self::Size {
            kind: FrameSizeKind::TooShort,
            details: details.into(),
        }
    }

    pub fn too_long(details: impl Into<String>) -> Self {
        Self::Size {
            kind: FrameSizeKind::TooLong,
            details: details.into(),
        }
    }

    pub fn format(kind: FrameFormatKind, details: impl Into<String>) -> Self {
        Self::Format {
            kind,
            details: details.into(),
        }
    }

    pub fn crc(calculated: u16, received: u16, frame: &[u8]) -> Self {
        Self::Crc {
            calculated,
            received,
            frame_hex: hex::encode(frame),
        }
    }
}

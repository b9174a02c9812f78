mod exception;
mod frame_format;
mod frame_size;

pub use exception::ExceptionCode;
pub use frame_format::FrameFormatKind;
pub use frame_size::FrameSizeKind;

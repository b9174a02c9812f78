//! RTU framing carried over a reliable TCP stream instead of a serial
//! line. Byte-for-byte identical framing to serial RTU — same CRC, same
//! length-driven shape inference — but TCP never drops or reorders bytes
//! within a connection, so the inactivity-based resync that serial RTU
//! needs has nothing to protect against here; a decode failure just closes
//! the connection, same as MBAP.

pub use super::rtu::{encode_frame, Decoder, Frame, FrameRole};

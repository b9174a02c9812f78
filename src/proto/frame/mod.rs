//! Transport framing: MBAP for TCP, CRC-framed RTU for serial, and RTU
//! framing reused verbatim over a reliable TCP stream.

pub mod mbap;
pub mod rtu;
pub mod rtu_over_tcp;

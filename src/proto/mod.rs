//! Transport-independent Modbus protocol layer: byte buffer helpers,
//! CRC-16, the PDU codec, MEI-14 device identification, and the three
//! transport framing variants.

pub mod buffer;
pub mod crc;
pub mod frame;
pub mod mei;
pub mod pdu;

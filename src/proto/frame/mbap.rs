//! MBAP (Modbus Application Protocol) framing for TCP: `transaction_id,
//! protocol_id, length, unit_id, pdu`. `length` counts bytes from
//! `unit_id` onward — it does not include the two-byte length field
//! itself. There is no CRC; TCP's own checksum covers wire integrity.

use crate::errors::{FrameError, FrameFormatKind};

const HEADER_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub transaction_id: u16,
    pub unit_id: u8,
    pub pdu: Vec<u8>,
}

enum State {
    ReadingHeader,
    ReadingPdu { transaction_id: u16, unit_id: u8, remaining: usize },
}

/// Streaming MBAP decoder. A validation failure (bad `protocol_id`, or a
/// `length` too small to contain the unit id byte) is unrecoverable for
/// the stream — there is no resync within an MBAP connection, so the
/// caller should close it.
pub struct Decoder {
    buf: Vec<u8>,
    state: State,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: State::ReadingHeader,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Attempts to decode one frame, returning `Ok(None)` if more bytes
    /// are needed. Consumes exactly what it decodes.
    pub fn try_decode(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            match &self.state {
                State::ReadingHeader => {
                    if self.buf.len() < HEADER_LEN {
                        return Ok(None);
                    }
                    let transaction_id = u16::from_be_bytes([self.buf[0], self.buf[1]]);
                    let protocol_id = u16::from_be_bytes([self.buf[2], self.buf[3]]);
                    let length = u16::from_be_bytes([self.buf[4], self.buf[5]]) as usize;
                    let unit_id = self.buf[6];

                    if protocol_id != 0 {
                        return Err(FrameError::format(
                            FrameFormatKind::InvalidProtocolId,
                            format!("expected protocol_id 0, got {protocol_id}"),
                        ));
                    }
                    if length == 0 {
                        return Err(FrameError::format(
                            FrameFormatKind::InvalidHeader,
                            "length field must cover at least the unit id byte".to_string(),
                        ));
                    }
                    if length > 255 {
                        return Err(FrameError::too_long(format!(
                            "MBAP length {length} exceeds the 255-byte PDU ceiling"
                        )));
                    }

                    self.buf.drain(..HEADER_LEN);
                    self.state = State::ReadingPdu {
                        transaction_id,
                        unit_id,
                        remaining: length - 1,
                    };
                }
                State::ReadingPdu {
                    transaction_id,
                    unit_id,
                    remaining,
                } => {
                    if self.buf.len() < *remaining {
                        return Ok(None);
                    }
                    let pdu = self.buf[..*remaining].to_vec();
                    self.buf.drain(..*remaining);
                    let frame = Frame {
                        transaction_id: *transaction_id,
                        unit_id: *unit_id,
                        pdu,
                    };
                    self.state = State::ReadingHeader;
                    return Ok(Some(frame));
                }
            }
        }
    }
}

/// Encodes a complete MBAP frame: header plus PDU.
pub fn encode_frame(transaction_id: u16, unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let length = (pdu.len() + 1) as u16;
    let mut frame = Vec::with_capacity(HEADER_LEN + pdu.len());
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.push(unit_id);
    frame.extend_from_slice(pdu);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_a_frame() {
        let pdu = vec![0x03, 0x00, 0x0A, 0x00, 0x02];
        let bytes = encode_frame(0x0102, 0x05, &pdu);

        let mut decoder = Decoder::new();
        decoder.feed(&bytes);
        let frame = decoder.try_decode().unwrap().unwrap();
        assert_eq!(frame.transaction_id, 0x0102);
        assert_eq!(frame.unit_id, 0x05);
        assert_eq!(frame.pdu, pdu);
    }

    #[test]
    fn length_counts_from_unit_id_onward() {
        let pdu = vec![0x03, 0x00, 0x0A, 0x00, 0x02];
        let bytes = encode_frame(1, 5, &pdu);
        let length = u16::from_be_bytes([bytes[4], bytes[5]]);
        assert_eq!(length as usize, pdu.len() + 1);
        assert_eq!(bytes[2], 0);
        assert_eq!(bytes[3], 0);
    }

    #[test]
    fn decodes_frame_delivered_byte_at_a_time() {
        let pdu = vec![0x01, 0x02, 0xCD, 0x01];
        let bytes = encode_frame(7, 0x0C, &pdu);

        let mut decoder = Decoder::new();
        let mut decoded = None;
        for byte in bytes {
            decoder.feed(&[byte]);
            if let Some(frame) = decoder.try_decode().unwrap() {
                decoded = Some(frame);
            }
        }
        let frame = decoded.unwrap();
        assert_eq!(frame.transaction_id, 7);
        assert_eq!(frame.pdu, pdu);
    }

    #[test]
    fn rejects_nonzero_protocol_id() {
        let mut bytes = encode_frame(1, 5, &[0x03]);
        bytes[3] = 0x01;
        let mut decoder = Decoder::new();
        decoder.feed(&bytes);
        let err = decoder.try_decode().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Format {
                kind: FrameFormatKind::InvalidProtocolId,
                ..
            }
        ));
    }

    #[test]
    fn decodes_two_frames_back_to_back() {
        let pdu_a = vec![0x03, 0x00, 0x00, 0x00, 0x01];
        let pdu_b = vec![0x04, 0x00, 0x00, 0x00, 0x01];
        let mut bytes = encode_frame(1, 5, &pdu_a);
        bytes.extend(encode_frame(2, 5, &pdu_b));

        let mut decoder = Decoder::new();
        decoder.feed(&bytes);
        let first = decoder.try_decode().unwrap().unwrap();
        let second = decoder.try_decode().unwrap().unwrap();
        assert_eq!(first.pdu, pdu_a);
        assert_eq!(second.pdu, pdu_b);
    }
}

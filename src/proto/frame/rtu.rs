//! RTU serial framing: `unit_id, PDU, crc_lo, crc_hi`. No length field;
//! the decoder infers the frame boundary from the function code (and, for
//! multi-writes, the embedded byte_count) and confirms it with the CRC.
//!
//! The decoder is length-driven, not timer-driven — a server knows a
//! frame's shape because it is always decoding a *request*; a client
//! knows it because it is always decoding the *response* to the one
//! outstanding request on its single-flight queue. Both cases funnel
//! through [`pdu_len`].

use crate::errors::{FrameError, FrameFormatKind};
use crate::proto::crc;
use crate::proto::pdu::{
    FN_ENCAPSULATED_INTERFACE, FN_READ_COILS, FN_READ_DISCRETE_INPUTS, FN_READ_HOLDING_REGISTERS,
    FN_READ_INPUT_REGISTERS, FN_WRITE_MULTIPLE_COILS, FN_WRITE_MULTIPLE_REGISTERS,
    FN_WRITE_SINGLE_COIL, FN_WRITE_SINGLE_REGISTER,
};

const EXCEPTION_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRole {
    /// Decoding a request: the function code alone determines the shape.
    Request,
    /// Decoding a response to `expected_function`: exceptions aside, the
    /// response shape is determined by what was asked, not the function
    /// byte on the wire (which is the same byte, barring the 0x80 flag).
    Response { expected_function: u8 },
}

/// How many PDU bytes (function code onward, not counting CRC) a frame
/// needs given the bytes seen so far. `pdu_bytes` starts at the function
/// code. Returns `Ok(None)` when more bytes are needed to know.
pub fn pdu_len(pdu_bytes: &[u8], role: FrameRole) -> Result<Option<usize>, FrameError> {
    if pdu_bytes.is_empty() {
        return Ok(None);
    }
    let function = pdu_bytes[0];

    if function & EXCEPTION_FLAG != 0 {
        // Exception PDU: fn|0x80, code. Always 2 bytes, any role.
        return Ok(Some(2));
    }

    match role {
        FrameRole::Request => request_pdu_len(pdu_bytes, function),
        FrameRole::Response { expected_function } => {
            if function != expected_function {
                return Err(FrameError::format(
                    FrameFormatKind::UnexpectedResponse,
                    format!("response function {function:#04x} does not match expected {expected_function:#04x}"),
                ));
            }
            response_pdu_len(pdu_bytes, function)
        }
    }
}

fn request_pdu_len(pdu_bytes: &[u8], function: u8) -> Result<Option<usize>, FrameError> {
    match function {
        FN_READ_COILS | FN_READ_DISCRETE_INPUTS | FN_READ_HOLDING_REGISTERS | FN_READ_INPUT_REGISTERS => {
            Ok(Some(5))
        }
        FN_WRITE_SINGLE_COIL | FN_WRITE_SINGLE_REGISTER => Ok(Some(5)),
        FN_WRITE_MULTIPLE_COILS | FN_WRITE_MULTIPLE_REGISTERS => {
            if pdu_bytes.len() < 6 {
                return Ok(None);
            }
            let byte_count = pdu_bytes[5];
            Ok(Some(6 + byte_count as usize))
        }
        FN_ENCAPSULATED_INTERFACE => Ok(Some(4)),
        other => Err(FrameError::format(
            FrameFormatKind::ReservedFunction,
            format!("unsupported function code {other:#04x}"),
        )),
    }
}

fn response_pdu_len(pdu_bytes: &[u8], function: u8) -> Result<Option<usize>, FrameError> {
    match function {
        FN_READ_COILS | FN_READ_DISCRETE_INPUTS | FN_READ_HOLDING_REGISTERS | FN_READ_INPUT_REGISTERS => {
            if pdu_bytes.len() < 2 {
                return Ok(None);
            }
            let byte_count = pdu_bytes[1];
            Ok(Some(2 + byte_count as usize))
        }
        FN_WRITE_SINGLE_COIL | FN_WRITE_SINGLE_REGISTER => Ok(Some(5)),
        FN_WRITE_MULTIPLE_COILS | FN_WRITE_MULTIPLE_REGISTERS => Ok(Some(5)),
        FN_ENCAPSULATED_INTERFACE => {
            // fn, mei_type, category, conformity, more_follows, next_id, n_objects
            if pdu_bytes.len() < 7 {
                return Ok(None);
            }
            let object_count = pdu_bytes[6] as usize;
            let mut offset = 7;
            for _ in 0..object_count {
                if pdu_bytes.len() < offset + 2 {
                    return Ok(None);
                }
                let object_len = pdu_bytes[offset + 1] as usize;
                offset += 2 + object_len;
            }
            if pdu_bytes.len() < offset {
                return Ok(None);
            }
            Ok(Some(offset))
        }
        other => Err(FrameError::format(
            FrameFormatKind::ReservedFunction,
            format!("unsupported function code {other:#04x}"),
        )),
    }
}

/// A complete, CRC-verified RTU frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub unit_id: u8,
    pub pdu: Vec<u8>,
}

/// Incremental RTU frame decoder. Bytes accumulate via [`Decoder::feed`];
/// [`Decoder::try_decode`] attempts to carve a complete frame out of what
/// has accumulated so far, given the role of the frame being awaited.
///
/// Resynchronization is the caller's responsibility: inactivity-based
/// resync (≥ 3.5 character times of silence discards a partial frame)
/// requires a timer tied to the actual serial read
/// loop. [`Decoder::reset`] is the hook the caller invokes on that timeout.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Attempts to decode one frame. On success, the consumed bytes are
    /// drained from the internal buffer. On a CRC mismatch the whole
    /// accumulated buffer is dropped (the frame boundary guess was wrong,
    /// so there's nothing salvageable) and the error is returned for the
    /// caller to count and log.
    pub fn try_decode(&mut self, role: FrameRole) -> Result<Option<Frame>, FrameError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let unit_id = self.buf[0];
        let pdu_region = &self.buf[1..];
        let needed = match pdu_len(pdu_region, role) {
            Ok(Some(n)) => n,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.buf.clear();
                return Err(err);
            }
        };
        let total = 1 + needed + 2; // unit_id + pdu + crc
        if self.buf.len() < total {
            return Ok(None);
        }

        let frame_bytes = &self.buf[..total - 2];
        let received_crc = u16::from_le_bytes([self.buf[total - 2], self.buf[total - 1]]);
        let calculated_crc = crc::crc16(frame_bytes);
        if calculated_crc != received_crc {
            let err = FrameError::crc(calculated_crc, received_crc, &self.buf[..total]);
            self.buf.drain(..total);
            return Err(err);
        }

        let pdu = self.buf[1..total - 2].to_vec();
        self.buf.drain(..total);
        Ok(Some(Frame { unit_id, pdu }))
    }
}

/// Encodes a complete RTU frame: `unit_id, pdu, crc_lo, crc_hi`.
pub fn encode_frame(unit_id: u8, pdu: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + pdu.len() + 2);
    frame.push(unit_id);
    frame.extend_from_slice(pdu);
    let crc_bytes = crc::crc16_bytes(&frame);
    frame.extend_from_slice(&crc_bytes);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_request_frame() {
        let pdu = [0x03, 0x00, 0x0A, 0x00, 0x02];
        let frame_bytes = encode_frame(0x05, &pdu);

        let mut decoder = Decoder::new();
        decoder.feed(&frame_bytes);
        let frame = decoder.try_decode(FrameRole::Request).unwrap().unwrap();
        assert_eq!(frame.unit_id, 0x05);
        assert_eq!(frame.pdu, pdu);
        assert!(decoder.is_empty());
    }

    #[test]
    fn decodes_byte_at_a_time() {
        let pdu = [0x10, 0x00, 0x02, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02];
        let frame_bytes = encode_frame(0x0A, &pdu);

        let mut decoder = Decoder::new();
        for (i, byte) in frame_bytes.iter().enumerate() {
            decoder.feed(&[*byte]);
            let result = decoder.try_decode(FrameRole::Request).unwrap();
            if i + 1 < frame_bytes.len() {
                assert!(result.is_none());
            } else {
                assert_eq!(result.unwrap().pdu, pdu);
            }
        }
    }

    #[test]
    fn crc_mismatch_is_reported_and_buffer_cleared() {
        let pdu = [0x03, 0x00, 0x0A, 0x00, 0x02];
        let mut frame_bytes = encode_frame(0x05, &pdu);
        let last = frame_bytes.len() - 1;
        frame_bytes[last] ^= 0xFF;

        let mut decoder = Decoder::new();
        decoder.feed(&frame_bytes);
        let err = decoder.try_decode(FrameRole::Request).unwrap_err();
        assert!(matches!(err, FrameError::Crc { .. }));
        assert!(decoder.is_empty());
    }

    #[test]
    fn response_shape_follows_expected_function() {
        let pdu = [0x03, 0x04, 0x00, 0x03, 0x00, 0x07];
        let frame_bytes = encode_frame(0x05, &pdu);

        let mut decoder = Decoder::new();
        decoder.feed(&frame_bytes);
        let frame = decoder
            .try_decode(FrameRole::Response {
                expected_function: FN_READ_HOLDING_REGISTERS,
            })
            .unwrap()
            .unwrap();
        assert_eq!(frame.pdu, pdu);
    }

    #[test]
    fn exception_response_decodes_regardless_of_expected_function() {
        let pdu = [0x83, 0x02];
        let frame_bytes = encode_frame(0x05, &pdu);

        let mut decoder = Decoder::new();
        decoder.feed(&frame_bytes);
        let frame = decoder
            .try_decode(FrameRole::Response {
                expected_function: FN_READ_HOLDING_REGISTERS,
            })
            .unwrap()
            .unwrap();
        assert_eq!(frame.pdu, pdu);
    }
}

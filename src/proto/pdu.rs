//! Function-specific PDU encode/decode for function codes 1, 2, 3, 4, 5, 6,
//! 15, 16, and 43/MEI‑14. The PDU itself is transport‑independent: it knows
//! nothing of MBAP headers, unit ids, or CRCs (those live in `proto::frame`).

use super::buffer::{expect_byte_count, pack_bits, unpack_bits, Reader, Writer};
use super::mei::{self, MeiCategory, MeiResponse};
use crate::errors::{ExceptionCode, FrameError, FrameFormatKind};

pub const FN_READ_COILS: u8 = 0x01;
pub const FN_READ_DISCRETE_INPUTS: u8 = 0x02;
pub const FN_READ_HOLDING_REGISTERS: u8 = 0x03;
pub const FN_READ_INPUT_REGISTERS: u8 = 0x04;
pub const FN_WRITE_SINGLE_COIL: u8 = 0x05;
pub const FN_WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const FN_WRITE_MULTIPLE_COILS: u8 = 0x0F;
pub const FN_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
pub const FN_ENCAPSULATED_INTERFACE: u8 = 0x2B;

const EXCEPTION_FLAG: u8 = 0x80;

const MAX_COIL_READ: u16 = 2000;
const MAX_REGISTER_READ: u16 = 125;
const MAX_COIL_WRITE: u16 = 1968;
const MAX_REGISTER_WRITE: u16 = 123;

/// A decoded request PDU, addressed but not yet validated against any
/// particular device's table boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadCoils { start: u16, count: u16 },
    ReadDiscreteInputs { start: u16, count: u16 },
    ReadHoldingRegisters { start: u16, count: u16 },
    ReadInputRegisters { start: u16, count: u16 },
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { start: u16, values: Vec<bool> },
    WriteMultipleRegisters { start: u16, values: Vec<u16> },
    ReadDeviceIdentification { category: MeiCategory, object_id: u8 },
}

impl Request {
    pub fn function_code(&self) -> u8 {
        match self {
            Self::ReadCoils { .. } => FN_READ_COILS,
            Self::ReadDiscreteInputs { .. } => FN_READ_DISCRETE_INPUTS,
            Self::ReadHoldingRegisters { .. } => FN_READ_HOLDING_REGISTERS,
            Self::ReadInputRegisters { .. } => FN_READ_INPUT_REGISTERS,
            Self::WriteSingleCoil { .. } => FN_WRITE_SINGLE_COIL,
            Self::WriteSingleRegister { .. } => FN_WRITE_SINGLE_REGISTER,
            Self::WriteMultipleCoils { .. } => FN_WRITE_MULTIPLE_COILS,
            Self::WriteMultipleRegisters { .. } => FN_WRITE_MULTIPLE_REGISTERS,
            Self::ReadDeviceIdentification { .. } => FN_ENCAPSULATED_INTERFACE,
        }
    }
}

/// A decoded response PDU. Read responses are already trimmed to the
/// request's `count` — the wire's trailing pad bits are not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadBits(Vec<bool>),
    ReadRegisters(Vec<u16>),
    WriteSingleCoil { address: u16, value: bool },
    WriteSingleRegister { address: u16, value: u16 },
    WriteMultipleCoils { start: u16, count: u16 },
    WriteMultipleRegisters { start: u16, count: u16 },
    ReadDeviceIdentification(MeiResponse),
}

/// What a client gets back after sending a `Request`: either the decoded
/// response, or a well-formed exception PDU from the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOrException {
    Response(Response),
    Exception(ExceptionCode),
}

fn validate_read_range(start: u16, count: u16, max: u16) -> Result<(), FrameError> {
    if count == 0 || count > max {
        return Err(FrameError::format(
            FrameFormatKind::InvalidByteCount,
            format!("read count {count} out of range [1, {max}]"),
        ));
    }
    if (start as u32) + (count as u32) > 65536 {
        return Err(FrameError::format(
            FrameFormatKind::InvalidByteCount,
            format!("start {start} + count {count} exceeds address space"),
        ));
    }
    Ok(())
}

pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut w = Writer::new();
    match request {
        Request::ReadCoils { start, count } => {
            w.u8(FN_READ_COILS).u16(*start).u16(*count);
        }
        Request::ReadDiscreteInputs { start, count } => {
            w.u8(FN_READ_DISCRETE_INPUTS).u16(*start).u16(*count);
        }
        Request::ReadHoldingRegisters { start, count } => {
            w.u8(FN_READ_HOLDING_REGISTERS).u16(*start).u16(*count);
        }
        Request::ReadInputRegisters { start, count } => {
            w.u8(FN_READ_INPUT_REGISTERS).u16(*start).u16(*count);
        }
        Request::WriteSingleCoil { address, value } => {
            w.u8(FN_WRITE_SINGLE_COIL)
                .u16(*address)
                .u16(if *value { 0xFF00 } else { 0x0000 });
        }
        Request::WriteSingleRegister { address, value } => {
            w.u8(FN_WRITE_SINGLE_REGISTER).u16(*address).u16(*value);
        }
        Request::WriteMultipleCoils { start, values } => {
            let payload = pack_bits(values);
            w.u8(FN_WRITE_MULTIPLE_COILS)
                .u16(*start)
                .u16(values.len() as u16)
                .u8(payload.len() as u8)
                .bytes(&payload);
        }
        Request::WriteMultipleRegisters { start, values } => {
            w.u8(FN_WRITE_MULTIPLE_REGISTERS)
                .u16(*start)
                .u16(values.len() as u16)
                .u8((values.len() * 2) as u8);
            for value in values {
                w.u16(*value);
            }
        }
        Request::ReadDeviceIdentification { category, object_id } => {
            return mei::encode_mei_request(*category, *object_id);
        }
    }
    w.into_vec()
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, FrameError> {
    let mut r = Reader::new(bytes);
    let function = r.u8()?;
    let request = match function {
        FN_READ_COILS | FN_READ_DISCRETE_INPUTS | FN_READ_HOLDING_REGISTERS | FN_READ_INPUT_REGISTERS => {
            let start = r.u16()?;
            let count = r.u16()?;
            r.finish()?;
            let max = if function == FN_READ_COILS || function == FN_READ_DISCRETE_INPUTS {
                MAX_COIL_READ
            } else {
                MAX_REGISTER_READ
            };
            validate_read_range(start, count, max)?;
            match function {
                FN_READ_COILS => Request::ReadCoils { start, count },
                FN_READ_DISCRETE_INPUTS => Request::ReadDiscreteInputs { start, count },
                FN_READ_HOLDING_REGISTERS => Request::ReadHoldingRegisters { start, count },
                _ => Request::ReadInputRegisters { start, count },
            }
        }
        FN_WRITE_SINGLE_COIL => {
            let address = r.u16()?;
            let raw = r.u16()?;
            r.finish()?;
            let value = match raw {
                0xFF00 => true,
                0x0000 => false,
                other => {
                    return Err(FrameError::format(
                        FrameFormatKind::InvalidByteCount,
                        format!("coil value must be 0x0000 or 0xFF00, got {other:#06x}"),
                    ))
                }
            };
            Request::WriteSingleCoil { address, value }
        }
        FN_WRITE_SINGLE_REGISTER => {
            let address = r.u16()?;
            let value = r.u16()?;
            r.finish()?;
            Request::WriteSingleRegister { address, value }
        }
        FN_WRITE_MULTIPLE_COILS => {
            let start = r.u16()?;
            let count = r.u16()?;
            let byte_count = r.u8()?;
            validate_read_range(start, count, MAX_COIL_WRITE)?;
            let expected_bytes = (count as usize).div_ceil(8);
            let payload = r.bytes(expected_bytes)?;
            expect_byte_count(byte_count, expected_bytes, "write multiple coils")?;
            r.finish()?;
            let values = unpack_bits(payload, count as usize);
            Request::WriteMultipleCoils { start, values }
        }
        FN_WRITE_MULTIPLE_REGISTERS => {
            let start = r.u16()?;
            let count = r.u16()?;
            let byte_count = r.u8()?;
            validate_read_range(start, count, MAX_REGISTER_WRITE)?;
            expect_byte_count(byte_count, (count as usize) * 2, "write multiple registers")?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(r.u16()?);
            }
            r.finish()?;
            Request::WriteMultipleRegisters { start, values }
        }
        FN_ENCAPSULATED_INTERFACE => {
            let (category, object_id) = mei::decode_mei_request(bytes)?;
            Request::ReadDeviceIdentification { category, object_id }
        }
        other => {
            return Err(FrameError::format(
                FrameFormatKind::ReservedFunction,
                format!("unsupported function code {other:#04x}"),
            ))
        }
    };
    Ok(request)
}

fn encode_response_body(response: &Response) -> Vec<u8> {
    let mut w = Writer::new();
    match response {
        Response::ReadBits(bits) => {
            // Coil and discrete-input reads share this payload shape; the
            // function byte (which disambiguates them) is prefixed by
            // `encode_response`, the public entry point.
            let payload = pack_bits(bits);
            w.u8(payload.len() as u8).bytes(&payload);
        }
        Response::ReadRegisters(values) => {
            w.u8((values.len() * 2) as u8);
            for value in values {
                w.u16(*value);
            }
        }
        Response::WriteSingleCoil { address, value } => {
            w.u8(FN_WRITE_SINGLE_COIL)
                .u16(*address)
                .u16(if *value { 0xFF00 } else { 0x0000 });
        }
        Response::WriteSingleRegister { address, value } => {
            w.u8(FN_WRITE_SINGLE_REGISTER).u16(*address).u16(*value);
        }
        Response::WriteMultipleCoils { start, count } => {
            w.u8(FN_WRITE_MULTIPLE_COILS).u16(*start).u16(*count);
        }
        Response::WriteMultipleRegisters { start, count } => {
            w.u8(FN_WRITE_MULTIPLE_REGISTERS).u16(*start).u16(*count);
        }
        Response::ReadDeviceIdentification(mei_response) => {
            return mei::encode_mei_response(mei_response);
        }
    }
    w.into_vec()
}

/// Encodes a response PDU for the request it answers. `request` supplies
/// the function code for the read variants, which `Response` itself
/// doesn't carry since the same payload shape serves two function codes
/// (coils vs. discrete inputs, holding vs. input registers).
pub fn encode_response(request: &Request, response: &Response) -> Vec<u8> {
    match response {
        Response::ReadBits(_) | Response::ReadRegisters(_) => {
            let mut w = Writer::new();
            w.u8(request.function_code());
            w.bytes(&encode_response_body(response));
            w.into_vec()
        }
        _ => encode_response_body(response),
    }
}

pub fn encode_exception(function_code: u8, code: ExceptionCode) -> Vec<u8> {
    let mut w = Writer::with_capacity(2);
    w.u8(function_code | EXCEPTION_FLAG).u8(code.to_code());
    w.into_vec()
}

pub fn decode_exception(bytes: &[u8]) -> Result<Option<(u8, ExceptionCode)>, FrameError> {
    let mut r = Reader::new(bytes);
    let function = r.u8()?;
    if function & EXCEPTION_FLAG == 0 {
        return Ok(None);
    }
    let raw_code = r.u8()?;
    r.finish()?;
    let code = ExceptionCode::from_code(raw_code).ok_or_else(|| {
        FrameError::format(
            FrameFormatKind::InvalidHeader,
            format!("unknown exception code {raw_code:#04x}"),
        )
    })?;
    Ok(Some((function & !EXCEPTION_FLAG, code)))
}

/// Decodes a response PDU for a request the caller already knows — reads
/// need the original `count` to know how many trailing pad bits in the
/// final payload byte to discard.
pub fn decode_response(request: &Request, bytes: &[u8]) -> Result<ResponseOrException, FrameError> {
    if let Some((_function, code)) = decode_exception(bytes)? {
        return Ok(ResponseOrException::Exception(code));
    }

    let mut r = Reader::new(bytes);
    let function = r.u8()?;
    if function != request.function_code() {
        return Err(FrameError::format(
            FrameFormatKind::UnexpectedResponse,
            format!(
                "response function {function:#04x} does not match request function {:#04x}",
                request.function_code()
            ),
        ));
    }

    let response = match request {
        Request::ReadCoils { count, .. } | Request::ReadDiscreteInputs { count, .. } => {
            let byte_count = r.u8()?;
            let expected_bytes = (*count as usize).div_ceil(8);
            let payload = r.bytes(expected_bytes)?;
            expect_byte_count(byte_count, expected_bytes, "read bits response")?;
            r.finish()?;
            Response::ReadBits(unpack_bits(payload, *count as usize))
        }
        Request::ReadHoldingRegisters { count, .. } | Request::ReadInputRegisters { count, .. } => {
            let byte_count = r.u8()?;
            expect_byte_count(byte_count, (*count as usize) * 2, "read registers response")?;
            let mut values = Vec::with_capacity(*count as usize);
            for _ in 0..*count {
                values.push(r.u16()?);
            }
            r.finish()?;
            Response::ReadRegisters(values)
        }
        Request::WriteSingleCoil { .. } => {
            let address = r.u16()?;
            let raw = r.u16()?;
            r.finish()?;
            let value = match raw {
                0xFF00 => true,
                0x0000 => false,
                other => {
                    return Err(FrameError::format(
                        FrameFormatKind::InvalidByteCount,
                        format!("coil echo value must be 0x0000 or 0xFF00, got {other:#06x}"),
                    ))
                }
            };
            Response::WriteSingleCoil { address, value }
        }
        Request::WriteSingleRegister { .. } => {
            let address = r.u16()?;
            let value = r.u16()?;
            r.finish()?;
            Response::WriteSingleRegister { address, value }
        }
        Request::WriteMultipleCoils { start, values } => {
            let echoed_start = r.u16()?;
            let echoed_count = r.u16()?;
            r.finish()?;
            if echoed_start != *start || echoed_count as usize != values.len() {
                return Err(FrameError::format(
                    FrameFormatKind::UnexpectedResponse,
                    "write multiple coils echo does not match request".to_string(),
                ));
            }
            Response::WriteMultipleCoils {
                start: echoed_start,
                count: echoed_count,
            }
        }
        Request::WriteMultipleRegisters { start, values } => {
            let echoed_start = r.u16()?;
            let echoed_count = r.u16()?;
            r.finish()?;
            if echoed_start != *start || echoed_count as usize != values.len() {
                return Err(FrameError::format(
                    FrameFormatKind::UnexpectedResponse,
                    "write multiple registers echo does not match request".to_string(),
                ));
            }
            Response::WriteMultipleRegisters {
                start: echoed_start,
                count: echoed_count,
            }
        }
        Request::ReadDeviceIdentification { .. } => {
            Response::ReadDeviceIdentification(mei::decode_mei_response(bytes)?)
        }
    };
    Ok(ResponseOrException::Response(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_coils_request_round_trips() {
        let request = Request::ReadCoils { start: 20, count: 10 };
        let bytes = encode_request(&request);
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }

    #[test]
    fn s1_read_coils_scenario() {
        // TT TT 00 00 00 06 0C 01 00 14 00 0A — unit 0x0C, fn 1, start 20, count 10.
        let request_pdu = [0x01, 0x00, 0x14, 0x00, 0x0A];
        let request = decode_request(&request_pdu).unwrap();
        assert_eq!(request, Request::ReadCoils { start: 20, count: 10 });

        // Server reply PDU: 01 02 CD 01 -> coils addr 20..29 = [T,F,T,T,F,F,T,T,T,F]
        let response_pdu = [0x01, 0x02, 0xCD, 0x01];
        match decode_response(&request, &response_pdu).unwrap() {
            ResponseOrException::Response(Response::ReadBits(bits)) => {
                assert_eq!(
                    bits,
                    vec![true, false, true, true, false, false, true, true, true, false]
                );
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn s2_read_holding_registers_scenario() {
        let request = Request::ReadHoldingRegisters { start: 10, count: 2 };
        let response_pdu = [0x03, 0x04, 0x00, 0x03, 0x00, 0x07];
        match decode_response(&request, &response_pdu).unwrap() {
            ResponseOrException::Response(Response::ReadRegisters(values)) => {
                assert_eq!(values, vec![3, 7]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn s3_write_single_coil_on_scenario() {
        let request = Request::WriteSingleCoil {
            address: 0xAD,
            value: true,
        };
        let bytes = encode_request(&request);
        assert_eq!(bytes, [0x05, 0x00, 0xAD, 0xFF, 0x00]);
        match decode_response(&request, &bytes).unwrap() {
            ResponseOrException::Response(Response::WriteSingleCoil { address, value }) => {
                assert_eq!(address, 0xAD);
                assert!(value);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn s4_write_multiple_registers_scenario() {
        let request = Request::WriteMultipleRegisters {
            start: 2,
            values: vec![10, 258],
        };
        let bytes = encode_request(&request);
        assert_eq!(
            bytes,
            [0x10, 0x00, 0x02, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02]
        );
        let response_pdu = [0x10, 0x00, 0x02, 0x00, 0x02];
        match decode_response(&request, &response_pdu).unwrap() {
            ResponseOrException::Response(Response::WriteMultipleRegisters { start, count }) => {
                assert_eq!(start, 2);
                assert_eq!(count, 2);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn s5_exception_scenario() {
        let request = Request::ReadDiscreteInputs { start: 24, count: 2 };
        let response_pdu = [0x82, 0x0B];
        match decode_response(&request, &response_pdu).unwrap() {
            ResponseOrException::Exception(code) => {
                assert_eq!(code, ExceptionCode::GatewayTargetDeviceFailedToRespond);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn unknown_function_is_reserved() {
        let err = decode_request(&[0x99, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Format {
                kind: FrameFormatKind::ReservedFunction,
                ..
            }
        ));
    }

    #[test]
    fn write_multiple_coils_round_trips() {
        let values = vec![true, false, true, true, false, true, false, true, true];
        let request = Request::WriteMultipleCoils { start: 100, values };
        let bytes = encode_request(&request);
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }

    #[test]
    fn read_count_zero_is_invalid_argument_shaped_error() {
        let bytes = [0x03, 0x00, 0x00, 0x00, 0x00];
        assert!(decode_request(&bytes).is_err());
    }

    #[test]
    fn read_count_over_max_is_rejected() {
        let bytes = [0x03, 0x00, 0x00, 0x00, 126];
        assert!(decode_request(&bytes).is_err());
    }
}

//! Function 43 / MEI type 0x0E: Read Device Identification.

use super::buffer::{Reader, Writer};
use crate::errors::{FrameError, FrameFormatKind};

pub const MEI_TYPE_READ_DEVICE_ID: u8 = 0x0E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeiCategory {
    Basic,
    Regular,
    Extended,
    Individual,
}

impl MeiCategory {
    pub fn to_code(self) -> u8 {
        match self {
            Self::Basic => 0x01,
            Self::Regular => 0x02,
            Self::Extended => 0x03,
            Self::Individual => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, FrameError> {
        match code {
            0x01 => Ok(Self::Basic),
            0x02 => Ok(Self::Regular),
            0x03 => Ok(Self::Extended),
            0x04 => Ok(Self::Individual),
            other => Err(FrameError::format(
                FrameFormatKind::InvalidHeader,
                format!("unknown MEI read-device-id category {other:#04x}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeiObject {
    pub id: u8,
    pub value: Vec<u8>,
}

/// Decoded MEI‑14 response. `more_follows` and `next_object_id` drive the
/// client's iteration loop; a finished read has `more_follows == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeiResponse {
    pub category: MeiCategory,
    pub conformity_level: u8,
    pub more_follows: bool,
    pub next_object_id: u8,
    pub objects: Vec<MeiObject>,
}

pub fn encode_mei_request(category: MeiCategory, object_id: u8) -> Vec<u8> {
    let mut w = Writer::with_capacity(4);
    w.u8(0x2B).u8(MEI_TYPE_READ_DEVICE_ID).u8(category.to_code()).u8(object_id);
    w.into_vec()
}

pub fn decode_mei_request(bytes: &[u8]) -> Result<(MeiCategory, u8), FrameError> {
    let mut r = Reader::new(bytes);
    let function = r.u8()?;
    if function != 0x2B {
        return Err(FrameError::format(
            FrameFormatKind::InvalidHeader,
            format!("not an MEI request (function {function:#04x})"),
        ));
    }
    let mei_type = r.u8()?;
    if mei_type != MEI_TYPE_READ_DEVICE_ID {
        return Err(FrameError::format(
            FrameFormatKind::InvalidHeader,
            format!("unsupported MEI type {mei_type:#04x}"),
        ));
    }
    let category = MeiCategory::from_code(r.u8()?)?;
    let object_id = r.u8()?;
    r.finish()?;
    Ok((category, object_id))
}

pub fn encode_mei_response(response: &MeiResponse) -> Vec<u8> {
    let mut w = Writer::new();
    w.u8(0x2B)
        .u8(MEI_TYPE_READ_DEVICE_ID)
        .u8(response.category.to_code())
        .u8(response.conformity_level)
        .u8(if response.more_follows { 0xFF } else { 0x00 })
        .u8(response.next_object_id)
        .u8(response.objects.len() as u8);
    for object in &response.objects {
        w.u8(object.id).u8(object.value.len() as u8).bytes(&object.value);
    }
    w.into_vec()
}

pub fn decode_mei_response(bytes: &[u8]) -> Result<MeiResponse, FrameError> {
    let mut r = Reader::new(bytes);
    let function = r.u8()?;
    if function != 0x2B {
        return Err(FrameError::format(
            FrameFormatKind::InvalidHeader,
            format!("not an MEI response (function {function:#04x})"),
        ));
    }
    let mei_type = r.u8()?;
    if mei_type != MEI_TYPE_READ_DEVICE_ID {
        return Err(FrameError::format(
            FrameFormatKind::InvalidHeader,
            format!("unsupported MEI type {mei_type:#04x}"),
        ));
    }
    let category = MeiCategory::from_code(r.u8()?)?;
    let conformity_level = r.u8()?;
    let more_follows = match r.u8()? {
        0x00 => false,
        0xFF => true,
        other => {
            return Err(FrameError::format(
                FrameFormatKind::InvalidByteCount,
                format!("more_follows must be 0x00 or 0xFF, got {other:#04x}"),
            ))
        }
    };
    let next_object_id = r.u8()?;
    let object_count = r.u8()?;
    let mut objects = Vec::with_capacity(object_count as usize);
    for _ in 0..object_count {
        let id = r.u8()?;
        let len = r.u8()? as usize;
        let value = r.bytes(len)?.to_vec();
        objects.push(MeiObject { id, value });
    }
    r.finish()?;
    Ok(MeiResponse {
        category,
        conformity_level,
        more_follows,
        next_object_id,
        objects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let bytes = encode_mei_request(MeiCategory::Basic, 0x00);
        let (category, object_id) = decode_mei_request(&bytes).unwrap();
        assert_eq!(category, MeiCategory::Basic);
        assert_eq!(object_id, 0x00);
    }

    #[test]
    fn response_round_trips_with_multiple_objects() {
        let response = MeiResponse {
            category: MeiCategory::Basic,
            conformity_level: 0x01,
            more_follows: false,
            next_object_id: 0x00,
            objects: vec![
                MeiObject {
                    id: 0,
                    value: b"AM.WD".to_vec(),
                },
                MeiObject {
                    id: 1,
                    value: b"Mini-Test".to_vec(),
                },
                MeiObject {
                    id: 2,
                    value: b"1.2.3.4".to_vec(),
                },
            ],
        };
        let bytes = encode_mei_response(&response);
        let decoded = decode_mei_response(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn s6_mei_basic_scenario() {
        let response = MeiResponse {
            category: MeiCategory::Basic,
            conformity_level: 0x01,
            more_follows: false,
            next_object_id: 0x00,
            objects: vec![
                MeiObject {
                    id: 0,
                    value: b"AM.WD".to_vec(),
                },
                MeiObject {
                    id: 1,
                    value: b"Mini-Test".to_vec(),
                },
                MeiObject {
                    id: 2,
                    value: b"1.2.3.4".to_vec(),
                },
            ],
        };
        let decoded = decode_mei_response(&encode_mei_response(&response)).unwrap();
        assert_eq!(decoded.objects.len(), 3);
        assert!(!decoded.more_follows);
    }
}

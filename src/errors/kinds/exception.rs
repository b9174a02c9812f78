/// Modbus exception codes, as carried in an exception PDU's second byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    NegativeAcknowledge,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetDeviceFailedToRespond,
}

impl ExceptionCode {
    pub fn to_code(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::ServerDeviceBusy => 0x06,
            Self::NegativeAcknowledge => 0x07,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetDeviceFailedToRespond => 0x0B,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::IllegalFunction),
            0x02 => Some(Self::IllegalDataAddress),
            0x03 => Some(Self::IllegalDataValue),
            0x04 => Some(Self::ServerDeviceFailure),
            0x05 => Some(Self::Acknowledge),
            0x06 => Some(Self::ServerDeviceBusy),
            0x07 => Some(Self::NegativeAcknowledge),
            0x08 => Some(Self::MemoryParityError),
            0x0A => Some(Self::GatewayPathUnavailable),
            0x0B => Some(Self::GatewayTargetDeviceFailedToRespond),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalFunction => write!(f, "illegal function"),
            Self::IllegalDataAddress => write!(f, "illegal data address"),
            Self::IllegalDataValue => write!(f, "illegal data value"),
            Self::ServerDeviceFailure => write!(f, "server device failure"),
            Self::Acknowledge => write!(f, "acknowledge"),
            Self::ServerDeviceBusy => write!(f, "server device busy"),
            Self::NegativeAcknowledge => write!(f, "negative acknowledge"),
            Self::MemoryParityError => write!(f, "memory parity error"),
            Self::GatewayPathUnavailable => write!(f, "gateway path unavailable"),
            Self::GatewayTargetDeviceFailedToRespond => {
                write!(f, "gateway target device failed to respond")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_code() {
        let all = [
            ExceptionCode::IllegalFunction,
            ExceptionCode::IllegalDataAddress,
            ExceptionCode::IllegalDataValue,
            ExceptionCode::ServerDeviceFailure,
            ExceptionCode::Acknowledge,
            ExceptionCode::ServerDeviceBusy,
            ExceptionCode::NegativeAcknowledge,
            ExceptionCode::MemoryParityError,
            ExceptionCode::GatewayPathUnavailable,
            ExceptionCode::GatewayTargetDeviceFailedToRespond,
        ];
        for kind in all {
            assert_eq!(ExceptionCode::from_code(kind.to_code()), Some(kind));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(ExceptionCode::from_code(0x09), None);
        assert_eq!(ExceptionCode::from_code(0x7F), None);
    }
}

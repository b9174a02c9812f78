//! Transport-independent request execution: given a decoded PDU and the
//! unit id it was addressed to, runs it against the address space and
//! produces either a `Response` or an `ExceptionCode`. Both the TCP and
//! RTU listeners funnel through [`dispatch`].

use crate::address_space::{Devices, WriteKind};
use crate::errors::ExceptionCode;
use crate::proto::pdu::{Request, Response};

pub enum Dispatch {
    Response(Response),
    Exception(ExceptionCode),
    /// The unit id addressed has no device configured on this server.
    UnknownUnit,
}

pub async fn dispatch(devices: &Devices, unit_id: u8, request: &Request) -> Dispatch {
    let Some(device) = devices.get(unit_id) else {
        return Dispatch::UnknownUnit;
    };

    match request {
        Request::ReadCoils { start, count } => {
            let bits = device.coils().read_range(*start, *count).await;
            Dispatch::Response(Response::ReadBits(bits))
        }
        Request::ReadDiscreteInputs { start, count } => {
            let bits = device.discrete_inputs().read_range(*start, *count).await;
            Dispatch::Response(Response::ReadBits(bits))
        }
        Request::ReadHoldingRegisters { start, count } => {
            let values = device.holding_registers().read_range(*start, *count).await;
            Dispatch::Response(Response::ReadRegisters(values))
        }
        Request::ReadInputRegisters { start, count } => {
            let values = device.input_registers().read_range(*start, *count).await;
            Dispatch::Response(Response::ReadRegisters(values))
        }
        Request::WriteSingleCoil { address, value } => {
            device.write_single_coil(*address, *value).await;
            Dispatch::Response(Response::WriteSingleCoil {
                address: *address,
                value: *value,
            })
        }
        Request::WriteSingleRegister { address, value } => {
            device.write_single_register(*address, *value).await;
            Dispatch::Response(Response::WriteSingleRegister {
                address: *address,
                value: *value,
            })
        }
        Request::WriteMultipleCoils { start, values } => {
            let count = values.len() as u16;
            device.write_multiple_coils(*start, values.clone()).await;
            Dispatch::Response(Response::WriteMultipleCoils { start: *start, count })
        }
        Request::WriteMultipleRegisters { start, values } => {
            let count = values.len() as u16;
            device.write_multiple_registers(*start, values.clone()).await;
            Dispatch::Response(Response::WriteMultipleRegisters { start: *start, count })
        }
        Request::ReadDeviceIdentification { .. } => {
            // Device identification objects aren't part of the address
            // space's read/write tables; a server exposing them would
            // need its own object store. Until one exists, report it the
            // way a real device reports a function it doesn't implement.
            Dispatch::Exception(ExceptionCode::IllegalFunction)
        }
    }
}

#[allow(dead_code)]
fn describe_write(kind: &WriteKind) -> &'static str {
    match kind {
        WriteKind::Coils(_) => "coils",
        WriteKind::Registers(_) => "registers",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::Devices;

    #[tokio::test]
    async fn unknown_unit_is_reported() {
        let devices = Devices::from_unit_ids([1]);
        let result = dispatch(&devices, 9, &Request::ReadCoils { start: 0, count: 1 }).await;
        assert!(matches!(result, Dispatch::UnknownUnit));
    }

    #[tokio::test]
    async fn read_holding_registers_reflects_prior_writes() {
        let devices = Devices::from_unit_ids([1]);
        dispatch(
            &devices,
            1,
            &Request::WriteSingleRegister { address: 5, value: 99 },
        )
        .await;

        match dispatch(&devices, 1, &Request::ReadHoldingRegisters { start: 5, count: 1 }).await {
            Dispatch::Response(Response::ReadRegisters(values)) => assert_eq!(values, vec![99]),
            _ => panic!("expected a register response"),
        }
    }
}

//! RTU server loop: a single bus, read and answered one frame at a time.
//! Shared between a real serial port and RTU-over-TCP — both carry the
//! same CRC-framed bytes.

use std::net::SocketAddr;
use std::time::Duration;

use serialport::SerialPort;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::address_space::Devices;
use crate::config::RtsType;
use crate::errors::ServerError;
use crate::proto::frame::rtu::{self, FrameRole};
use crate::proto::pdu;

use super::dispatcher::{dispatch, Dispatch};

/// Drives a single RTU serial bus. Frames addressed to a unit id this
/// server doesn't answer for are silently dropped — RTU has no channel
/// to report "unknown unit" back to a sender that may not even be
/// listening for this unit's replies. `rts_type` toggles RTS in software
/// around each reply; pass `RtsType::None` for ports whose driver or
/// wiring already handles the bus turnaround.
pub async fn serve_serial(
    mut port: Box<dyn SerialPort + Send>,
    devices: Devices,
    rts_type: RtsType,
    rts_delay: Duration,
) -> Result<(), ServerError> {
    info!("Modbus RTU server listening on serial port");
    let mut decoder = rtu::Decoder::new();
    let mut buf = [0u8; 256];

    loop {
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(err) => return Err(err.into()),
        };
        if n == 0 {
            continue;
        }
        decoder.feed(&buf[..n]);

        loop {
            match decoder.try_decode(FrameRole::Request) {
                Ok(Some(frame)) => {
                    if let Some(response) = handle_frame(&devices, frame.unit_id, &frame.pdu).await {
                        let out = rtu::encode_frame(frame.unit_id, &response);
                        write_with_rts(port.as_mut(), &out, rts_type, rts_delay).await?;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "malformed RTU frame, resynchronizing");
                    decoder.reset();
                    break;
                }
            }
        }
    }
}

async fn write_with_rts(
    port: &mut (dyn SerialPort + Send),
    buf: &[u8],
    rts_type: RtsType,
    rts_delay: Duration,
) -> std::io::Result<()> {
    if rts_type == RtsType::None {
        return port.write_all(buf);
    }
    let to_io_err = |err: serialport::Error| std::io::Error::other(err);
    port.write_request_to_send(rts_type.to_signal_level(true)).map_err(to_io_err)?;
    if !rts_delay.is_zero() {
        tokio::time::sleep(rts_delay).await;
    }
    port.write_all(buf)?;
    port.flush()?;
    port.write_request_to_send(rts_type.to_signal_level(false)).map_err(to_io_err)?;
    if !rts_delay.is_zero() {
        tokio::time::sleep(rts_delay).await;
    }
    Ok(())
}

pub async fn serve_rtu_over_tcp(bind_addr: SocketAddr, devices: Devices) -> Result<(), ServerError> {
    let listener = TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "Modbus RTU-over-TCP server listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        let devices = devices.clone();
        tokio::spawn(async move {
            info!(%peer, "client connected");
            if let Err(err) = handle_rtu_over_tcp_connection(socket, devices).await {
                warn!(%peer, error = %err, "connection ended with an error");
            }
        });
    }
}

async fn handle_rtu_over_tcp_connection(mut socket: TcpStream, devices: Devices) -> Result<(), ServerError> {
    let mut decoder = rtu::Decoder::new();
    let mut buf = [0u8; 256];

    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        decoder.feed(&buf[..n]);

        loop {
            match decoder.try_decode(FrameRole::Request) {
                Ok(Some(frame)) => {
                    if let Some(response) = handle_frame(&devices, frame.unit_id, &frame.pdu).await {
                        let out = rtu::encode_frame(frame.unit_id, &response);
                        socket.write_all(&out).await?;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "malformed RTU-over-TCP frame, resynchronizing");
                    decoder.reset();
                    break;
                }
            }
        }
    }
}

async fn handle_frame(devices: &Devices, unit_id: u8, pdu_bytes: &[u8]) -> Option<Vec<u8>> {
    let request = pdu::decode_request(pdu_bytes).ok()?;
    match dispatch(devices, unit_id, &request).await {
        Dispatch::Response(response) => Some(pdu::encode_response(&request, &response)),
        Dispatch::Exception(code) => Some(pdu::encode_exception(request.function_code(), code)),
        Dispatch::UnknownUnit => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::Devices;

    #[tokio::test]
    async fn unknown_unit_produces_no_reply() {
        let devices = Devices::from_unit_ids([1]);
        let request_pdu = pdu::encode_request(&crate::proto::pdu::Request::ReadCoils { start: 0, count: 1 });
        assert!(handle_frame(&devices, 9, &request_pdu).await.is_none());
    }

    #[tokio::test]
    async fn known_unit_answers() {
        let devices = Devices::from_unit_ids([4]);
        let request_pdu = pdu::encode_request(&crate::proto::pdu::Request::WriteSingleCoil { address: 0, value: true });
        let response = handle_frame(&devices, 4, &request_pdu).await.unwrap();
        assert_eq!(response, [0x05, 0x00, 0x00, 0xFF, 0x00]);
    }
}

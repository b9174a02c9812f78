//! MBAP/TCP listener: one task per accepted connection, admission
//! controlled by `ConnectionManager`, each request dispatched
//! independently so one client's malformed frame never touches another's.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::address_space::Devices;
use crate::config::ServerConfig;
use crate::connection::ConnectionManager;
use crate::errors::{ExceptionCode, FrameError, FrameFormatKind, ServerError};
use crate::proto::frame::mbap;
use crate::proto::pdu;

use super::dispatcher::{dispatch, Dispatch};

/// Binds through `socket2` so `SO_REUSEADDR` can be set before `listen`;
/// a restarted station shouldn't have to wait out `TIME_WAIT` on the
/// previous process's socket.
fn bind_reuseaddr(bind_addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if bind_addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&bind_addr.into())?;
    socket.listen(1024)?;
    TcpListener::from_std(socket.into())
}

pub async fn serve(
    bind_addr: SocketAddr,
    config: ServerConfig,
    devices: Arc<Devices>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<(), ServerError> {
    let listener = bind_reuseaddr(bind_addr)?;
    info!(%bind_addr, "Modbus TCP server listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        match connection_manager.accept_connection(peer).await {
            Ok(guard) => {
                let devices = Arc::clone(&devices);
                let manager = Arc::clone(&connection_manager);
                let idle_timeout = config.per_connection_idle_timeout;
                tokio::spawn(async move {
                    info!(%peer, "client connected");
                    if let Err(err) = handle_connection(socket, peer, &devices, &manager, idle_timeout).await {
                        warn!(%peer, error = %err, "connection ended with an error");
                    }
                    drop(guard);
                });
            }
            Err(err) => {
                warn!(%peer, error = %err, "connection rejected");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    peer: SocketAddr,
    devices: &Devices,
    manager: &ConnectionManager,
    idle_timeout: Duration,
) -> Result<(), ServerError> {
    socket.set_nodelay(true)?;
    let mut decoder = mbap::Decoder::new();
    let mut buf = [0u8; 512];

    loop {
        let n = match timeout(idle_timeout, socket.read(&mut buf)).await {
            Ok(Ok(0)) => {
                debug!(%peer, "client disconnected");
                return Ok(());
            }
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => {
                debug!(%peer, "idle timeout");
                return Ok(());
            }
        };
        decoder.feed(&buf[..n]);

        loop {
            let frame = match decoder.try_decode() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!(%peer, error = %err, "malformed MBAP frame, closing connection");
                    return Err(ServerError::Frame(err));
                }
            };

            let response_bytes = handle_frame(devices, &frame).await;
            let success = response_bytes.is_some();
            manager.record_request(peer, success).await;
            if let Some((transaction_id, unit_id, pdu)) = response_bytes {
                let out = mbap::encode_frame(transaction_id, unit_id, &pdu);
                socket.write_all(&out).await?;
            }
        }
    }
}

/// Decodes and dispatches one MBAP-framed PDU, returning the encoded
/// response frame fields to send back. Returns `None` for a decode
/// failure the wire protocol has no answer for (the connection is kept
/// open; only the malformed PDU is skipped).
async fn handle_frame(devices: &Devices, frame: &mbap::Frame) -> Option<(u16, u8, Vec<u8>)> {
    let request = match pdu::decode_request(&frame.pdu) {
        Ok(request) => request,
        Err(FrameError::Format { kind: FrameFormatKind::ReservedFunction, .. }) => {
            let exception = pdu::encode_exception(frame.pdu.first().copied().unwrap_or(0), ExceptionCode::IllegalFunction);
            return Some((frame.transaction_id, frame.unit_id, exception));
        }
        Err(FrameError::Format { kind: FrameFormatKind::InvalidByteCount, .. }) => {
            let exception = pdu::encode_exception(frame.pdu.first().copied().unwrap_or(0), ExceptionCode::IllegalDataValue);
            return Some((frame.transaction_id, frame.unit_id, exception));
        }
        Err(err) => {
            warn!(error = %err, "unrecoverable frame decode error");
            return None;
        }
    };

    let pdu_bytes = match dispatch(devices, frame.unit_id, &request).await {
        Dispatch::Response(response) => pdu::encode_response(&request, &response),
        Dispatch::Exception(code) => pdu::encode_exception(request.function_code(), code),
        Dispatch::UnknownUnit => {
            pdu::encode_exception(request.function_code(), ExceptionCode::GatewayTargetDeviceFailedToRespond)
        }
    };
    Some((frame.transaction_id, frame.unit_id, pdu_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_space::Devices;

    #[tokio::test]
    async fn unknown_unit_id_yields_gateway_exception() {
        let devices = Devices::from_unit_ids([1]);
        let request_pdu = pdu::encode_request(&crate::proto::pdu::Request::ReadCoils { start: 0, count: 1 });
        let frame = mbap::Frame {
            transaction_id: 7,
            unit_id: 9,
            pdu: request_pdu,
        };
        let (transaction_id, unit_id, response) = handle_frame(&devices, &frame).await.unwrap();
        assert_eq!(transaction_id, 7);
        assert_eq!(unit_id, 9);
        assert_eq!(response[0], 0x81);
        assert_eq!(response[1], ExceptionCode::GatewayTargetDeviceFailedToRespond.to_code());
    }

    #[tokio::test]
    async fn known_unit_serves_reads() {
        let devices = Devices::from_unit_ids([3]);
        devices
            .get(3)
            .unwrap()
            .write_single_register(0, 77)
            .await;

        let request_pdu = pdu::encode_request(&crate::proto::pdu::Request::ReadHoldingRegisters { start: 0, count: 1 });
        let frame = mbap::Frame {
            transaction_id: 1,
            unit_id: 3,
            pdu: request_pdu,
        };
        let (_, _, response) = handle_frame(&devices, &frame).await.unwrap();
        assert_eq!(response, vec![0x03, 0x02, 0x00, 0x4D]);
    }
}

//! Client sessions: a multiplexed [`TcpSession`] for MBAP/TCP, and a
//! single-flight [`SerialSession`] shared by RTU-over-serial and
//! RTU-over-TCP (the two only differ in what carries the CRC-framed
//! bytes, not in how the bus is driven).

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serialport::SerialPort;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::RtsType;
use crate::errors::SessionError;
use crate::proto::frame::{mbap, rtu};
use crate::proto::pdu::{self, MeiCategory, Request, Response, ResponseOrException};

use super::queue::{channel as queue_channel, QueueHandle};
use super::reconnect::ReconnectPolicy;
use super::state::ConnectionState;
use super::transaction::TransactionRegistry;
use super::validate;

const MAX_MEI_ITERATIONS: usize = 16;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type Connector<S> =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = std::io::Result<S>> + Send>> + Send + Sync>;

/// Multiplexed Modbus TCP client session: many requests may be in flight
/// at once, matched to their response by MBAP transaction id.
pub struct TcpSession<S: AsyncRead + AsyncWrite + Unpin + Send + 'static> {
    writer: Arc<AsyncMutex<WriteHalf<S>>>,
    registry: Arc<TransactionRegistry>,
    pending_shapes: Arc<StdMutex<HashMap<u16, Request>>>,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    connector: Connector<S>,
    reconnect_budget: Option<Duration>,
}

impl TcpSession<TcpStream> {
    /// Connects to `addr` and returns a running session.
    pub async fn connect(addr: SocketAddr, reconnect_budget: Option<Duration>) -> Result<Self, SessionError> {
        let connector: Connector<TcpStream> = Arc::new(move || Box::pin(TcpStream::connect(addr)));
        let stream = connector().await?;
        Ok(Self::from_stream(stream, connector, reconnect_budget))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send + 'static> TcpSession<S> {
    /// Builds a session around an already-connected transport. `connector`
    /// is invoked to obtain a fresh transport on reconnect; sessions built
    /// over a transport that cannot be re-established (e.g. a test
    /// `tokio::io::duplex` half) should pass a connector that always
    /// errors, so a dropped connection surfaces as `Disconnected(Fatal)`
    /// rather than looping forever.
    pub fn from_stream(stream: S, connector: Connector<S>, reconnect_budget: Option<Duration>) -> Self {
        let (read_half, write_half) = split(stream);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let state_tx = Arc::new(state_tx);
        let registry = Arc::new(TransactionRegistry::new());
        let pending_shapes = Arc::new(StdMutex::new(HashMap::new()));

        let session = Self {
            writer: Arc::new(AsyncMutex::new(write_half)),
            registry: Arc::clone(&registry),
            pending_shapes: Arc::clone(&pending_shapes),
            state_rx,
            state_tx: Arc::clone(&state_tx),
            connector: Arc::clone(&connector),
            reconnect_budget,
        };

        spawn_tcp_reader(
            read_half,
            Arc::clone(&session.writer),
            registry,
            pending_shapes,
            state_tx,
            connector,
            reconnect_budget,
        );
        session
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    async fn request(&self, unit_id: u8, request: Request, deadline: Duration) -> Result<ResponseOrException, SessionError> {
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected);
        }

        let (transaction_id, rx) = self.registry.register();
        self.pending_shapes.lock().unwrap().insert(transaction_id, request.clone());

        let pdu = pdu::encode_request(&request);
        let frame = mbap::encode_frame(transaction_id, unit_id, &pdu);

        {
            let mut writer = self.writer.lock().await;
            if let Err(err) = writer.write_all(&frame).await {
                self.registry.remove(transaction_id);
                self.pending_shapes.lock().unwrap().remove(&transaction_id);
                return Err(SessionError::from(err));
            }
        }

        match timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::ConnectionLost("transaction sender dropped".into())),
            Err(_) => {
                self.registry.remove(transaction_id);
                self.pending_shapes.lock().unwrap().remove(&transaction_id);
                Err(SessionError::Timeout)
            }
        }
    }

    pub async fn read_coils(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<bool>, SessionError> {
        validate::read_coils(start, count)?;
        match self.request(unit_id, Request::ReadCoils { start, count }, DEFAULT_REQUEST_TIMEOUT).await? {
            ResponseOrException::Response(Response::ReadBits(bits)) => Ok(bits),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn read_discrete_inputs(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<bool>, SessionError> {
        validate::read_discrete_inputs(start, count)?;
        match self
            .request(unit_id, Request::ReadDiscreteInputs { start, count }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::ReadBits(bits)) => Ok(bits),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn read_holding_registers(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<u16>, SessionError> {
        validate::read_holding_registers(start, count)?;
        match self
            .request(unit_id, Request::ReadHoldingRegisters { start, count }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::ReadRegisters(values)) => Ok(values),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn read_input_registers(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<u16>, SessionError> {
        validate::read_input_registers(start, count)?;
        match self
            .request(unit_id, Request::ReadInputRegisters { start, count }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::ReadRegisters(values)) => Ok(values),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn write_single_coil(&self, unit_id: u8, address: u16, value: bool) -> Result<(), SessionError> {
        match self
            .request(unit_id, Request::WriteSingleCoil { address, value }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::WriteSingleCoil { .. }) => Ok(()),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn write_single_register(&self, unit_id: u8, address: u16, value: u16) -> Result<(), SessionError> {
        match self
            .request(unit_id, Request::WriteSingleRegister { address, value }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::WriteSingleRegister { .. }) => Ok(()),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn write_multiple_coils(&self, unit_id: u8, start: u16, values: Vec<bool>) -> Result<(), SessionError> {
        validate::write_multiple_coils(start, values.len())?;
        match self
            .request(unit_id, Request::WriteMultipleCoils { start, values }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::WriteMultipleCoils { .. }) => Ok(()),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn write_multiple_registers(&self, unit_id: u8, start: u16, values: Vec<u16>) -> Result<(), SessionError> {
        validate::write_multiple_registers(start, values.len())?;
        match self
            .request(unit_id, Request::WriteMultipleRegisters { start, values }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::WriteMultipleRegisters { .. }) => Ok(()),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    /// Reads every device identification object by repeatedly issuing
    /// function 43/MEI‑14 requests, starting at object id 0 and following
    /// `next_object_id` until `more_follows` is false. Later objects
    /// overwrite earlier ones with the same id, matching how a single
    /// logical read accumulates across several PDUs on the wire.
    pub async fn read_device_identification(&self, unit_id: u8, category: MeiCategory) -> Result<Vec<pdu::MeiObject>, SessionError> {
        let mut objects: Vec<pdu::MeiObject> = Vec::new();
        let mut object_id = 0u8;
        for _ in 0..MAX_MEI_ITERATIONS {
            let response = match self
                .request(
                    unit_id,
                    Request::ReadDeviceIdentification { category, object_id },
                    DEFAULT_REQUEST_TIMEOUT,
                )
                .await?
            {
                ResponseOrException::Response(Response::ReadDeviceIdentification(mei)) => mei,
                ResponseOrException::Exception(code) => return Err(SessionError::ProtocolException(code)),
                _ => return Err(SessionError::ConnectionLost("unexpected response shape".into())),
            };

            for object in response.objects {
                if let Some(existing) = objects.iter_mut().find(|o| o.id == object.id) {
                    *existing = object;
                } else {
                    objects.push(object);
                }
            }

            if !response.more_follows {
                return Ok(objects);
            }
            object_id = response.next_object_id;
        }
        Err(SessionError::ConnectionLost(
            "device identification read did not terminate within the iteration cap".into(),
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_tcp_reader<S: AsyncRead + AsyncWrite + Unpin + Send + 'static>(
    read_half: ReadHalf<S>,
    writer: Arc<AsyncMutex<WriteHalf<S>>>,
    registry: Arc<TransactionRegistry>,
    pending_shapes: Arc<StdMutex<HashMap<u16, Request>>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    connector: Connector<S>,
    reconnect_budget: Option<Duration>,
) {
    tokio::spawn(async move {
        run_tcp_reader(read_half, Arc::clone(&registry), Arc::clone(&pending_shapes), Arc::clone(&state_tx)).await;

        let _ = state_tx.send(ConnectionState::Reconnecting);
        registry.fail_all(|| SessionError::connection_lost("connection dropped"));

        let mut policy = ReconnectPolicy::new(reconnect_budget);
        policy.begin();
        loop {
            let Some(delay) = policy.next_delay() else {
                warn!("reconnect budget exhausted, giving up");
                let _ = state_tx.send(ConnectionState::DisconnectedFatal);
                return;
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match connector().await {
                Ok(stream) => {
                    info!(attempts = policy.attempts(), "reconnected");
                    let (new_read, new_write) = split(stream);
                    *writer.lock().await = new_write;
                    let _ = state_tx.send(ConnectionState::Connected);
                    spawn_tcp_reader(new_read, writer, registry, pending_shapes, state_tx, connector, reconnect_budget);
                    return;
                }
                Err(err) => {
                    debug!(error = %err, attempt = policy.attempts(), "reconnect attempt failed");
                }
            }
        }
    });
}

async fn run_tcp_reader<S: AsyncRead + AsyncWrite + Unpin + Send + 'static>(
    mut read_half: ReadHalf<S>,
    registry: Arc<TransactionRegistry>,
    pending_shapes: Arc<StdMutex<HashMap<u16, Request>>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
) {
    let mut decoder = mbap::Decoder::new();
    let mut buf = [0u8; 512];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("peer closed the connection");
                return;
            }
            Ok(n) => n,
            Err(err) => {
                error!(error = %err, "tcp read error");
                return;
            }
        };
        decoder.feed(&buf[..n]);
        loop {
            match decoder.try_decode() {
                Ok(Some(frame)) => {
                    let request = pending_shapes.lock().unwrap().remove(&frame.transaction_id);
                    let Some(request) = request else {
                        warn!(transaction_id = frame.transaction_id, "response for unknown transaction");
                        continue;
                    };
                    let result = pdu::decode_response(&request, &frame.pdu).map_err(SessionError::from);
                    registry.resolve(frame.transaction_id, result);
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "malformed MBAP stream, closing connection");
                    let _ = state_tx.send(ConnectionState::Reconnecting);
                    return;
                }
            }
        }
    }
}

/// A physical or logical serial link: blocking `serialport::SerialPort`
/// for RTU, or an async `TcpStream` for RTU-over-TCP. Both carry the same
/// CRC-framed bytes, so one worker loop drives either.
enum SerialTransport {
    Serial {
        port: Box<dyn SerialPort + Send>,
        rts_type: RtsType,
        rts_delay: Duration,
    },
    Tcp(TcpStream),
}

impl SerialTransport {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Serial { port, rts_type, rts_delay } if *rts_type != RtsType::None => {
                use std::io::Write;
                let to_io_err = |err: serialport::Error| std::io::Error::other(err);
                port.write_request_to_send(rts_type.to_signal_level(true)).map_err(to_io_err)?;
                if !rts_delay.is_zero() {
                    tokio::time::sleep(*rts_delay).await;
                }
                port.write_all(buf)?;
                port.flush()?;
                port.write_request_to_send(rts_type.to_signal_level(false)).map_err(to_io_err)?;
                if !rts_delay.is_zero() {
                    tokio::time::sleep(*rts_delay).await;
                }
                Ok(())
            }
            Self::Serial { port, .. } => {
                use std::io::Write;
                port.write_all(buf)
            }
            Self::Tcp(stream) => stream.write_all(buf).await,
        }
    }

    async fn read_some(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial { port, .. } => {
                use std::io::Read;
                match port.read(buf) {
                    Ok(n) => Ok(n),
                    Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Ok(0),
                    Err(err) => Err(err),
                }
            }
            Self::Tcp(stream) => stream.read(buf).await,
        }
    }
}

/// Single-flight client session for RTU and RTU-over-TCP: at most one
/// request is ever outstanding, mirroring the half-duplex physical bus.
pub struct SerialSession {
    queue: QueueHandle,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SerialSession {
    /// `rts_type` selects whether (and which polarity) RTS is toggled
    /// around each transmission in software; `RtsType::None` leaves the
    /// line alone, matching a port whose driver or wiring handles it.
    pub fn from_serial_port(port: Box<dyn SerialPort + Send>, rts_type: RtsType, rts_delay: Duration) -> Self {
        Self::spawn(SerialTransport::Serial { port, rts_type, rts_delay })
    }

    pub fn from_tcp_stream(stream: TcpStream) -> Self {
        Self::spawn(SerialTransport::Tcp(stream))
    }

    fn spawn(transport: SerialTransport) -> Self {
        let (queue, mut receiver) = queue_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connected);

        tokio::spawn(async move {
            let mut transport = transport;
            let mut decoder = rtu::Decoder::new();
            while let Some(queued) = receiver.recv().await {
                let outcome = run_single_flight(&mut transport, &mut decoder, &queued).await;
                if let Err(ref err) = outcome {
                    warn!(error = %err, "RTU transaction failed");
                }
                let _ = queued.completion.send(outcome);
            }
            let _ = state_tx.send(ConnectionState::DisconnectedFatal);
        });

        Self { queue, state_rx }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    async fn request(&self, unit_id: u8, request: Request, deadline: Duration) -> Result<ResponseOrException, SessionError> {
        if !self.state().is_terminal() {
            let rx = self.queue.submit(unit_id, request, deadline)?;
            match timeout(deadline, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(SessionError::ConnectionLost("worker task is gone".into())),
                Err(_) => Err(SessionError::Timeout),
            }
        } else {
            Err(SessionError::NotConnected)
        }
    }

    pub async fn read_coils(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<bool>, SessionError> {
        validate::read_coils(start, count)?;
        match self.request(unit_id, Request::ReadCoils { start, count }, DEFAULT_REQUEST_TIMEOUT).await? {
            ResponseOrException::Response(Response::ReadBits(bits)) => Ok(bits),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn read_holding_registers(&self, unit_id: u8, start: u16, count: u16) -> Result<Vec<u16>, SessionError> {
        validate::read_holding_registers(start, count)?;
        match self
            .request(unit_id, Request::ReadHoldingRegisters { start, count }, DEFAULT_REQUEST_TIMEOUT)
            .await?
        {
            ResponseOrException::Response(Response::ReadRegisters(values)) => Ok(values),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
            _ => Err(SessionError::ConnectionLost("unexpected response shape".into())),
        }
    }

    pub async fn write_single_coil(&self, unit_id: u8, address: u16, value: bool) -> Result<(), SessionError> {
        self.broadcast_or_request(unit_id, Request::WriteSingleCoil { address, value }).await
    }

    pub async fn write_single_register(&self, unit_id: u8, address: u16, value: u16) -> Result<(), SessionError> {
        self.broadcast_or_request(unit_id, Request::WriteSingleRegister { address, value }).await
    }

    pub async fn write_multiple_coils(&self, unit_id: u8, start: u16, values: Vec<bool>) -> Result<(), SessionError> {
        validate::write_multiple_coils(start, values.len())?;
        self.broadcast_or_request(unit_id, Request::WriteMultipleCoils { start, values }).await
    }

    pub async fn write_multiple_registers(&self, unit_id: u8, start: u16, values: Vec<u16>) -> Result<(), SessionError> {
        validate::write_multiple_registers(start, values.len())?;
        self.broadcast_or_request(unit_id, Request::WriteMultipleRegisters { start, values }).await
    }

    /// `unit_id == 0` is the RTU broadcast address: every device applies
    /// the write, but none replies, so there is nothing to wait for.
    async fn broadcast_or_request(&self, unit_id: u8, request: Request) -> Result<(), SessionError> {
        if unit_id == 0 {
            let rx = self.queue.submit(unit_id, request, DEFAULT_REQUEST_TIMEOUT)?;
            drop(rx);
            return Ok(());
        }
        match self.request(unit_id, request, DEFAULT_REQUEST_TIMEOUT).await? {
            ResponseOrException::Response(_) => Ok(()),
            ResponseOrException::Exception(code) => Err(SessionError::ProtocolException(code)),
        }
    }
}

async fn run_single_flight(
    transport: &mut SerialTransport,
    decoder: &mut rtu::Decoder,
    queued: &super::queue::QueuedRequest,
) -> Result<ResponseOrException, SessionError> {
    let pdu_bytes = pdu::encode_request(&queued.request);
    let frame = rtu::encode_frame(queued.unit_id, &pdu_bytes);
    transport.write_all(&frame).await?;

    if queued.unit_id == 0 {
        return Ok(ResponseOrException::Response(Response::WriteSingleCoil {
            address: 0,
            value: false,
        }));
    }

    decoder.reset();
    let deadline = tokio::time::Instant::now() + queued.deadline;
    let role = rtu::FrameRole::Response {
        expected_function: queued.request.function_code(),
    };
    let mut buf = [0u8; 256];
    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(SessionError::Timeout);
        }
        match timeout(deadline.saturating_duration_since(tokio::time::Instant::now()), transport.read_some(&mut buf)).await {
            Ok(Ok(0)) => continue,
            Ok(Ok(n)) => {
                decoder.feed(&buf[..n]);
                if let Some(frame) = decoder.try_decode(role)? {
                    return pdu::decode_response(&queued.request, &frame.pdu).map_err(SessionError::from);
                }
            }
            Ok(Err(err)) => return Err(SessionError::from(err)),
            Err(_) => return Err(SessionError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExceptionCode;

    fn never_reconnect() -> Connector<tokio::io::DuplexStream> {
        Arc::new(|| {
            Box::pin(async {
                Err::<tokio::io::DuplexStream, _>(std::io::Error::new(std::io::ErrorKind::Other, "no reconnect in tests"))
            })
        })
    }

    #[tokio::test]
    async fn tcp_session_rejects_arguments_before_touching_the_wire() {
        let (client, _server) = tokio::io::duplex(4096);
        let session = TcpSession::from_stream(client, never_reconnect(), None);
        let err = session.read_coils(1, 0, 0).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn tcp_session_round_trips_a_read_holding_registers_request() {
        let (client, mut server) = tokio::io::duplex(4096);
        let session = TcpSession::from_stream(client, never_reconnect(), None);

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let n = server.read(&mut buf).await.unwrap();
            let mut decoder = mbap::Decoder::new();
            decoder.feed(&buf[..n]);
            let frame = decoder.try_decode().unwrap().unwrap();
            assert_eq!(frame.unit_id, 9);

            let response_pdu = pdu::encode_response(
                &pdu::decode_request(&frame.pdu).unwrap(),
                &Response::ReadRegisters(vec![42]),
            );
            let response_frame = mbap::encode_frame(frame.transaction_id, 9, &response_pdu);
            server.write_all(&response_frame).await.unwrap();
        });

        let values = session.read_holding_registers(9, 10, 1).await.unwrap();
        assert_eq!(values, vec![42]);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn tcp_session_maps_exception_responses() {
        let (client, mut server) = tokio::io::duplex(4096);
        let session = TcpSession::from_stream(client, never_reconnect(), None);

        let handle = tokio::spawn(async move {
            let mut buf = [0u8; 256];
            let n = server.read(&mut buf).await.unwrap();
            let mut decoder = mbap::Decoder::new();
            decoder.feed(&buf[..n]);
            let frame = decoder.try_decode().unwrap().unwrap();

            let response_pdu = pdu::encode_exception(0x03, ExceptionCode::IllegalDataAddress);
            let response_frame = mbap::encode_frame(frame.transaction_id, frame.unit_id, &response_pdu);
            server.write_all(&response_frame).await.unwrap();
        });

        let err = session.read_holding_registers(9, 10, 1).await.unwrap_err();
        assert!(matches!(err, SessionError::ProtocolException(ExceptionCode::IllegalDataAddress)));
        handle.await.unwrap();
    }
}

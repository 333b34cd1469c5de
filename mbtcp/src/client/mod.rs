use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::client::connection::Connection;
use crate::client::service::*;
use crate::client::transaction::{ReplyResult, TransactionGuard};
use crate::constants::defaults;
use crate::decode::DecodeLevel;
use crate::error::{InternalError, RequestError};
use crate::tcp::frame::format_frame;
use crate::types::{AddressRange, Indexed, UnitId, WriteMultiple};

mod connection;
mod requests;
mod service;
mod sync;
mod transaction;

pub use sync::SyncClient;

/// Settings used by a [`Client`]
#[derive(Copy, Clone, Debug)]
pub struct ClientConfig {
    /// address of the server
    pub addr: SocketAddr,
    /// unit id placed in every request
    pub unit_id: UnitId,
    /// how long a request waits for its response
    pub response_timeout: Duration,
    /// level of protocol decoding written to the log
    pub decode: DecodeLevel,
}

impl ClientConfig {
    /// Default settings for a server at `addr`
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            unit_id: UnitId::new(1),
            response_timeout: defaults::RESPONSE_TIMEOUT,
            decode: DecodeLevel::nothing(),
        }
    }

    /// Use a different unit id
    pub fn unit_id(mut self, unit_id: UnitId) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Use a different response timeout
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Use a different decode level
    pub fn decode(mut self, decode: DecodeLevel) -> Self {
        self.decode = decode;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], defaults::PORT)))
    }
}

/// Async Modbus TCP client over a single persistent connection
///
/// Cloned handles share the connection, so requests from several tasks are
/// pipelined and matched to their responses by transaction id. The client
/// never reconnects on its own: after the connection is lost every request
/// fails with [`RequestError::NoConnection`] until [`Client::connect`] is
/// called again.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    connection: Arc<Mutex<Option<Arc<Connection>>>>,
}

impl Client {
    /// Create a client that is not yet connected
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Settings the client was created with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the TCP connection, replacing any existing one
    pub async fn connect(&self) -> Result<(), RequestError> {
        let addr = self.config.addr;
        let stream = tokio::net::TcpStream::connect(addr).await?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::warn!("unable to enable TCP_NODELAY: {}", err);
        }
        tracing::info!("connected to {}", addr);

        let span = tracing::info_span!("Modbus-Client-TCP", endpoint = ?addr);
        self.replace(Some(Connection::spawn(stream, self.config.decode, span)))
            .await
    }

    /// Close the connection. Requests still waiting for a response fail with
    /// [`RequestError::ConnectionClosed`] before this returns.
    pub async fn disconnect(&self) {
        if let Err(err) = self.replace(None).await {
            tracing::warn!("error during disconnect: {}", err);
        }
    }

    /// True while the connection is open and has not failed
    pub fn is_connected(&self) -> bool {
        self.current().is_ok()
    }

    async fn replace(&self, next: Option<Connection>) -> Result<(), RequestError> {
        let previous = {
            let mut guard = self
                .connection
                .lock()
                .map_err(|_| InternalError::PoisonedLock)?;
            std::mem::replace(&mut *guard, next.map(Arc::new))
        };

        if let Some(previous) = previous {
            previous.close().await;
        }

        Ok(())
    }

    fn current(&self) -> Result<Arc<Connection>, RequestError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| InternalError::PoisonedLock)?;
        match guard.as_ref() {
            Some(connection) if connection.is_open() => Ok(connection.clone()),
            _ => Err(RequestError::NoConnection),
        }
    }

    /// Read coils, returning exactly `count` values
    pub async fn read_coils(&self, address: u16, count: u16) -> Result<Vec<bool>, RequestError> {
        let range = AddressRange::try_from(address, count)?;
        self.make_service_call::<ReadCoils>(range).await
    }

    /// Read discrete inputs, returning exactly `count` values
    pub async fn read_discrete_inputs(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, RequestError> {
        let range = AddressRange::try_from(address, count)?;
        self.make_service_call::<ReadDiscreteInputs>(range).await
    }

    /// Read holding registers
    pub async fn read_holding_registers(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        let range = AddressRange::try_from(address, count)?;
        self.make_service_call::<ReadHoldingRegisters>(range).await
    }

    /// Read input registers
    pub async fn read_input_registers(
        &self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, RequestError> {
        let range = AddressRange::try_from(address, count)?;
        self.make_service_call::<ReadInputRegisters>(range).await
    }

    /// Write a single coil
    pub async fn write_single_coil(&self, address: u16, value: bool) -> Result<(), RequestError> {
        self.make_service_call::<WriteSingleCoil>(Indexed::new(address, value))
            .await
    }

    /// Write a single holding register
    pub async fn write_single_register(&self, address: u16, value: u16) -> Result<(), RequestError> {
        self.make_service_call::<WriteSingleRegister>(Indexed::new(address, value))
            .await
    }

    /// Write consecutive coils starting at `address`
    pub async fn write_multiple_coils(
        &self,
        address: u16,
        values: &[bool],
    ) -> Result<(), RequestError> {
        let request = WriteMultiple::from(address, values.to_vec())?;
        self.make_service_call::<WriteMultipleCoils>(request).await
    }

    /// Write consecutive holding registers starting at `address`
    pub async fn write_multiple_registers(
        &self,
        address: u16,
        values: &[u16],
    ) -> Result<(), RequestError> {
        let request = WriteMultiple::from(address, values.to_vec())?;
        self.make_service_call::<WriteMultipleRegisters>(request)
            .await
    }

    async fn make_service_call<S: Service>(
        &self,
        request: S::Request,
    ) -> Result<S::Response, RequestError> {
        S::check_request_validity(&request)?;
        let connection = self.current()?;
        let pdu = serialize_request::<S>(&request)?;
        let (tx_id, reply) = connection.transactions.register(S::FUNCTION)?;
        let guard = TransactionGuard::new(&connection.transactions, tx_id);

        self.execute::<S>(&connection, guard, reply, &request, &pdu)
            .instrument(tracing::info_span!("Transaction", tx_id = %tx_id))
            .await
    }

    // writing the request and waiting for its reply share one deadline
    async fn execute<S: Service>(
        &self,
        connection: &Connection,
        mut guard: TransactionGuard<'_>,
        reply: oneshot::Receiver<ReplyResult>,
        request: &S::Request,
        pdu: &[u8],
    ) -> Result<S::Response, RequestError> {
        let level = self.config.decode;
        let timeout = self.config.response_timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        if level.app.enabled() {
            if level.app.data_headers() {
                tracing::info!("PDU TX - {} {}", S::FUNCTION, request);
            } else {
                tracing::info!("PDU TX - {}", S::FUNCTION);
            }
        }

        let frame = format_frame(guard.id().to_u16(), self.config.unit_id, pdu, level.frame)?;

        match connection.send(&frame, deadline).await {
            Ok(()) => {}
            Err(RequestError::ResponseTimeout) => {
                tracing::warn!("request not written within {:?}", timeout);
                return Err(RequestError::ResponseTimeout);
            }
            Err(err) => {
                tracing::warn!("error writing request: {}", err);
                connection
                    .transactions
                    .fail_all(RequestError::ConnectionClosed);
                return Err(err);
            }
        }

        let response = match tokio::time::timeout_at(deadline, reply).await {
            Err(_) => {
                tracing::warn!("no response within {:?}", timeout);
                return Err(RequestError::ResponseTimeout);
            }
            // sender dropped without an answer
            Ok(Err(_)) => {
                guard.disarm();
                return Err(RequestError::ConnectionClosed);
            }
            Ok(Ok(result)) => {
                guard.disarm();
                result?
            }
        };

        let result = parse_reply::<S>(request, &response);
        match &result {
            Ok(_) => {
                if level.app.enabled() {
                    tracing::info!("PDU RX - {}", S::FUNCTION);
                }
            }
            Err(RequestError::Exception(ex)) => {
                tracing::warn!("PDU RX - Modbus exception {} ({:#04X})", ex, u8::from(*ex));
            }
            Err(err) => tracing::warn!("bad response: {}", err),
        }
        result
    }

    #[cfg(test)]
    pub(crate) fn attach<T>(&self, io: T) -> Result<(), RequestError>
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + 'static,
    {
        let connection = Connection::spawn(io, self.config.decode, tracing::Span::none());
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| InternalError::PoisonedLock)?;
        *guard = Some(Arc::new(connection));
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.current()
            .map(|c| c.transactions.pending_count())
            .unwrap_or(0)
    }
}

use crate::client::{Client, ClientConfig};
use crate::error::RequestError;

/// Blocking wrapper around [`Client`]
///
/// Owns a small tokio runtime and blocks the calling thread for each request,
/// so it must not be used from within another async runtime.
pub struct SyncClient {
    runtime: tokio::runtime::Runtime,
    inner: Client,
}

impl SyncClient {
    /// Create a blocking client that is not yet connected
    pub fn new(config: ClientConfig) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            inner: Client::new(config),
        })
    }

    /// The async client driven by this wrapper
    pub fn client(&self) -> &Client {
        &self.inner
    }

    /// Blocking version of [`Client::connect`]
    pub fn connect(&self) -> Result<(), RequestError> {
        self.runtime.block_on(self.inner.connect())
    }

    /// Blocking version of [`Client::disconnect`]
    pub fn disconnect(&self) {
        self.runtime.block_on(self.inner.disconnect())
    }

    /// See [`Client::is_connected`]
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Blocking version of [`Client::read_coils`]
    pub fn read_coils(&self, address: u16, count: u16) -> Result<Vec<bool>, RequestError> {
        self.runtime.block_on(self.inner.read_coils(address, count))
    }

    /// Blocking version of [`Client::read_discrete_inputs`]
    pub fn read_discrete_inputs(&self, address: u16, count: u16) -> Result<Vec<bool>, RequestError> {
        self.runtime
            .block_on(self.inner.read_discrete_inputs(address, count))
    }

    /// Blocking version of [`Client::read_holding_registers`]
    pub fn read_holding_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, RequestError> {
        self.runtime
            .block_on(self.inner.read_holding_registers(address, count))
    }

    /// Blocking version of [`Client::read_input_registers`]
    pub fn read_input_registers(&self, address: u16, count: u16) -> Result<Vec<u16>, RequestError> {
        self.runtime
            .block_on(self.inner.read_input_registers(address, count))
    }

    /// Blocking version of [`Client::write_single_coil`]
    pub fn write_single_coil(&self, address: u16, value: bool) -> Result<(), RequestError> {
        self.runtime
            .block_on(self.inner.write_single_coil(address, value))
    }

    /// Blocking version of [`Client::write_single_register`]
    pub fn write_single_register(&self, address: u16, value: u16) -> Result<(), RequestError> {
        self.runtime
            .block_on(self.inner.write_single_register(address, value))
    }

    /// Blocking version of [`Client::write_multiple_coils`]
    pub fn write_multiple_coils(&self, address: u16, values: &[bool]) -> Result<(), RequestError> {
        self.runtime
            .block_on(self.inner.write_multiple_coils(address, values))
    }

    /// Blocking version of [`Client::write_multiple_registers`]
    pub fn write_multiple_registers(&self, address: u16, values: &[u16]) -> Result<(), RequestError> {
        self.runtime
            .block_on(self.inner.write_multiple_registers(address, values))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn connect_to_closed_port_reports_io_error() {
        // bind then drop a listener to find a port nothing listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = SyncClient::new(
            ClientConfig::new(addr).response_timeout(Duration::from_millis(100)),
        )
        .unwrap();

        assert!(matches!(client.connect(), Err(RequestError::Io(_))));
        assert!(!client.is_connected());
        assert_eq!(client.read_holding_registers(0, 1), Err(RequestError::NoConnection));
    }
}

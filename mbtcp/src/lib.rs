//! An async implementation of the [Modbus](http://modbus.org/) TCP protocol
//! using [Tokio](https://docs.rs/tokio) and Rust's `async/await` syntax.
//!
//! # Features
//!
//! * Panic-free parsing of MBAP frames and PDUs
//! * Pipelined client requests matched to responses by transaction id
//! * Server over an in-memory datastore shared by every connection
//! * Protocol decoding written to [`tracing`](https://docs.rs/tracing) at configurable levels
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Write Multiple Coils
//! * Write Multiple Registers
//!
//! # Example
//!
//! A server and a client talking over loopback
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mbtcp::client::{Client, ClientConfig};
//! use mbtcp::decode::DecodeLevel;
//! use mbtcp::server::{spawn_tcp_server_task, Datastore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = spawn_tcp_server_task(
//!         "127.0.0.1:5020".parse()?,
//!         Arc::new(Datastore::default()),
//!         DecodeLevel::nothing(),
//!     )
//!     .await?;
//!
//!     let client = Client::new(ClientConfig::new(server.local_addr()));
//!     client.connect().await?;
//!     client.write_single_register(0, 1234).await?;
//!     assert_eq!(client.read_holding_registers(0, 1).await?, vec![1234]);
//!
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Client API
pub mod client;
/// Protocol constants and defaults
pub mod constants;
/// Controls protocol decoding in the log
pub mod decode;
/// Server API
pub mod server;

mod common;
mod error;
mod exception;
mod tcp;
mod types;

pub use crate::error::*;
pub use crate::exception::*;
pub use crate::tcp::frame;
pub use crate::types::*;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::Instrument;

use crate::decode::DecodeLevel;
use crate::tcp::server::ServerTask;

mod datastore;
pub(crate) mod request;
mod router;
pub(crate) mod task;

pub use datastore::*;
pub use router::RequestRouter;

/// A handle to the server's listener task. The server and all of its sessions
/// are shut down when the handle is dropped.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    tx: tokio::sync::mpsc::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to, useful when binding to port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, close every session, and wait for the listener task to exit
    pub async fn shutdown(self) {
        let Self { tx, handle, .. } = self;
        drop(tx);
        if let Err(err) = handle.await {
            tracing::warn!("server task did not exit cleanly: {}", err);
        }
    }
}

/// Bind a TCP listener and spawn a task that serves the datastore on every accepted connection
///
/// * `addr` - address to bind, port 0 picks a free port
/// * `datastore` - banks shared by every connection
/// * `decode` - level of protocol decoding written to the log
///
/// Must be called from within a tokio runtime.
pub async fn spawn_tcp_server_task(
    addr: SocketAddr,
    datastore: Arc<Datastore>,
    decode: DecodeLevel,
) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let router = RequestRouter::new(datastore, decode.app);

    let task = async move {
        ServerTask::new(listener, router, decode).run(rx).await;
    }
    .instrument(tracing::info_span!("Modbus-Server-TCP", "listen" = ?local_addr));

    let handle = tokio::spawn(task);

    Ok(ServerHandle {
        local_addr,
        tx,
        handle,
    })
}

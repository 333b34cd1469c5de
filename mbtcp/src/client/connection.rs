use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::Instrument;

use crate::client::transaction::TransactionManager;
use crate::common::frame::FramedReader;
use crate::common::phys;
use crate::decode::DecodeLevel;
use crate::error::RequestError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One open connection to a server
///
/// Requests are written through a shared write half while a background task
/// reads responses and hands them to the transaction manager.
pub(crate) struct Connection {
    writer: tokio::sync::Mutex<BoxedWriter>,
    pub(crate) transactions: Arc<TransactionManager>,
    reader: tokio::task::JoinHandle<()>,
    decode: DecodeLevel,
}

impl Connection {
    /// Split `io` and spawn the read loop inside `span`
    pub(crate) fn spawn<T>(io: T, decode: DecodeLevel, span: tracing::Span) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read, write) = tokio::io::split(io);
        let transactions = Arc::new(TransactionManager::new());
        let reader = tokio::spawn(read_loop(read, transactions.clone(), decode).instrument(span));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(write)),
            transactions,
            reader,
            decode,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        !self.transactions.is_closed()
    }

    /// Write one complete frame before `deadline`. Concurrent senders never interleave bytes.
    ///
    /// Missing the deadline while waiting for the write half returns
    /// `ResponseTimeout`. Missing it during the write also fails the connection,
    /// since part of the frame may already be on the wire.
    pub(crate) async fn send(&self, frame: &[u8], deadline: Instant) -> Result<(), RequestError> {
        let mut writer = match tokio::time::timeout_at(deadline, self.writer.lock()).await {
            Ok(writer) => writer,
            Err(_) => return Err(RequestError::ResponseTimeout),
        };

        let write = phys::write(&mut *writer, frame, self.decode.physical);
        match tokio::time::timeout_at(deadline, write).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!("peer stopped reading, closing connection");
                self.transactions.fail_all(RequestError::ConnectionClosed);
                self.reader.abort();
                Err(RequestError::ResponseTimeout)
            }
        }
    }

    /// Fail every pending request, stop reading, and shut down the write half
    ///
    /// Returns without waiting when another request holds the write half. That
    /// request gives it up at its own deadline.
    pub(crate) async fn close(&self) {
        self.transactions.fail_all(RequestError::ConnectionClosed);
        self.reader.abort();
        match self.writer.try_lock() {
            Ok(mut writer) => {
                if let Err(err) = writer.shutdown().await {
                    tracing::debug!("error shutting down connection: {}", err);
                }
            }
            Err(_) => tracing::debug!("write in progress, skipping shutdown"),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<T>(mut io: T, transactions: Arc<TransactionManager>, decode: DecodeLevel)
where
    T: AsyncRead + Unpin,
{
    let mut reader = FramedReader::new(decode);
    loop {
        match reader.next_frame(&mut io).await {
            Ok(frame) => {
                if transactions.complete(frame).is_err() {
                    return;
                }
            }
            Err(err) => {
                match err {
                    RequestError::Io(std::io::ErrorKind::UnexpectedEof) => {
                        tracing::info!("server closed the connection");
                    }
                    err => tracing::warn!("connection lost: {}", err),
                }
                transactions.fail_all(RequestError::ConnectionClosed);
                return;
            }
        }
    }
}

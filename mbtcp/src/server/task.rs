use tokio::io::{AsyncRead, AsyncWrite};

use crate::common::frame::FramedReader;
use crate::common::phys;
use crate::decode::DecodeLevel;
use crate::error::RequestError;
use crate::server::router::RequestRouter;
use crate::tcp::frame::format_frame;

/// Serves one connection: read a frame, route it, write the reply
pub(crate) struct SessionTask<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    io: T,
    router: RequestRouter,
    reader: FramedReader,
    shutdown: tokio::sync::mpsc::Receiver<()>,
    decode: DecodeLevel,
}

impl<T> SessionTask<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(
        io: T,
        router: RequestRouter,
        shutdown: tokio::sync::mpsc::Receiver<()>,
        decode: DecodeLevel,
    ) -> Self {
        Self {
            io,
            router,
            reader: FramedReader::new(decode),
            shutdown,
            decode,
        }
    }

    /// Runs until the peer disconnects, a frame is malformed, or the server shuts down
    pub(crate) async fn run(&mut self) -> Result<(), RequestError> {
        loop {
            tokio::select! {
                frame = self.reader.next_frame(&mut self.io) => {
                    let frame = frame?;
                    let reply = self.router.process(&frame.pdu);
                    let bytes = format_frame(frame.tx_id, frame.unit_id, &reply, self.decode.frame)?;
                    phys::write(&mut self.io, &bytes, self.decode.physical).await?;
                }
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            }
        }
    }
}

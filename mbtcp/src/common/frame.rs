use tokio::io::AsyncRead;

use crate::common::buffer::ReadBuffer;
use crate::decode::{DecodeLevel, PhysDecodeLevel};
use crate::error::RequestError;
use crate::tcp::frame::{constants, Frame, MbapParser};

#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, Hash, PartialOrd, Ord)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn to_u16(self) -> u16 {
        self.value
    }

    /// return the current value and advance, wrapping at u16::MAX
    pub(crate) fn next(&mut self) -> TxId {
        let ret = self.value;
        self.value = self.value.wrapping_add(1);
        TxId::new(ret)
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06X}", self.value)
    }
}

/// Reads complete frames from a byte stream that may deliver them in arbitrary segments
pub(crate) struct FramedReader {
    parser: MbapParser,
    buffer: ReadBuffer,
    level: PhysDecodeLevel,
}

impl FramedReader {
    pub(crate) fn new(decode: DecodeLevel) -> Self {
        Self {
            parser: MbapParser::new(decode.frame),
            buffer: ReadBuffer::new(constants::MAX_FRAME_LENGTH),
            level: decode.physical,
        }
    }

    pub(crate) async fn next_frame<T: AsyncRead + Unpin>(
        &mut self,
        io: &mut T,
    ) -> Result<Frame, RequestError> {
        loop {
            match self.parser.parse(&mut self.buffer)? {
                Some(frame) => return Ok(frame),
                None => {
                    self.buffer.read_some(io, self.level).await?;
                }
            }
        }
    }
}

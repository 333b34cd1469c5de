//! Encoding and decoding of Modbus TCP frames
//!
//! Every frame is a 7-byte MBAP header followed by the PDU:
//!
//! | field          | size | notes                       |
//! |----------------|------|-----------------------------|
//! | transaction id | 2    | big-endian                  |
//! | protocol id    | 2    | always zero                 |
//! | length         | 2    | unit id + PDU, big-endian   |
//! | unit id        | 1    |                             |
//! | PDU            | n    | function code + payload     |

use crate::common::buffer::ReadBuffer;
use crate::common::cursor::WriteCursor;
use crate::common::phys::format_bytes;
use crate::decode::FrameDecodeLevel;
use crate::error::{FrameParseError, InternalError, RequestError};
use crate::types::UnitId;

/// Sizes that bound an MBAP frame
pub mod constants {
    /// Size of the MBAP header including the unit id
    pub const HEADER_LENGTH: usize = 7;
    /// Largest PDU that fits in a frame
    pub const MAX_PDU_LENGTH: usize = 253;
    /// Largest complete frame
    pub const MAX_FRAME_LENGTH: usize = HEADER_LENGTH + MAX_PDU_LENGTH;
    /// Largest allowed value of the length field, which includes the 1 byte unit id
    pub const MAX_LENGTH_FIELD: usize = MAX_PDU_LENGTH + 1;
}

/// A decoded Modbus TCP frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Transaction identifier used to match responses to requests
    pub tx_id: u16,
    /// Unit identifier passed through to the addressed device
    pub unit_id: UnitId,
    /// Function code and function-specific payload
    pub pdu: Vec<u8>,
}

impl Frame {
    /// Construct a frame from its parts
    pub fn new(tx_id: u16, unit_id: UnitId, pdu: Vec<u8>) -> Self {
        Self {
            tx_id,
            unit_id,
            pdu,
        }
    }
}

/// Encode a PDU into a complete frame of exactly `7 + pdu.len()` bytes
pub fn encode(tx_id: u16, unit_id: UnitId, pdu: &[u8]) -> Result<Vec<u8>, InternalError> {
    if pdu.len() > constants::MAX_PDU_LENGTH {
        return Err(InternalError::AduTooBig(pdu.len()));
    }

    let mut buffer = [0u8; constants::MAX_FRAME_LENGTH];
    let mut cursor = WriteCursor::new(&mut buffer);
    cursor.write_u16_be(tx_id)?;
    cursor.write_u16_be(0)?;
    // bounded above, the cast cannot truncate
    cursor.write_u16_be((pdu.len() + 1) as u16)?;
    cursor.write_u8(unit_id.value)?;
    cursor.write_bytes(pdu)?;
    Ok(cursor.written().to_vec())
}

/// Decode a buffer that holds exactly one frame
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameParseError> {
    if bytes.len() < constants::HEADER_LENGTH {
        return Err(FrameParseError::InsufficientHeader(bytes.len()));
    }

    let (header, pdu) = bytes.split_at(constants::HEADER_LENGTH);
    let header = MbapHeader::new(
        u16::from_be_bytes([header[0], header[1]]),
        u16::from_be_bytes([header[2], header[3]]),
        u16::from_be_bytes([header[4], header[5]]),
        header[6],
    )?;

    if pdu.len() != header.pdu_length {
        return Err(FrameParseError::LengthMismatch {
            declared: header.pdu_length + 1,
            actual: pdu.len() + 1,
        });
    }

    Ok(Frame::new(header.tx_id, header.unit_id, pdu.to_vec()))
}

#[derive(Clone, Copy, Debug)]
struct MbapHeader {
    tx_id: u16,
    pdu_length: usize,
    unit_id: UnitId,
}

impl MbapHeader {
    fn new(tx_id: u16, protocol_id: u16, length: u16, unit_id: u8) -> Result<Self, FrameParseError> {
        let length = length as usize;

        if protocol_id != 0 {
            return Err(FrameParseError::UnknownProtocolId(protocol_id));
        }

        if length > constants::MAX_LENGTH_FIELD {
            return Err(FrameParseError::MbapLengthTooBig(
                length,
                constants::MAX_LENGTH_FIELD,
            ));
        }

        // must be > 0 b/c the 1-byte unit identifier counts towards length
        if length == 0 {
            return Err(FrameParseError::MbapLengthZero);
        }

        Ok(Self {
            tx_id,
            pdu_length: length - 1,
            unit_id: UnitId::new(unit_id),
        })
    }
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    Header(MbapHeader),
}

/// Incrementally parses frames out of a [`ReadBuffer`]
pub(crate) struct MbapParser {
    state: ParseState,
    level: FrameDecodeLevel,
}

impl MbapParser {
    pub(crate) fn new(level: FrameDecodeLevel) -> Self {
        Self {
            state: ParseState::Begin,
            level,
        }
    }

    fn parse_header(cursor: &mut ReadBuffer) -> Result<MbapHeader, RequestError> {
        let tx_id = cursor.read_u16_be()?;
        let protocol_id = cursor.read_u16_be()?;
        let length = cursor.read_u16_be()?;
        let unit_id = cursor.read_u8()?;
        Ok(MbapHeader::new(tx_id, protocol_id, length, unit_id)?)
    }

    /// Ok(None) means that more data is required to complete the frame
    pub(crate) fn parse(&mut self, cursor: &mut ReadBuffer) -> Result<Option<Frame>, RequestError> {
        match self.state {
            ParseState::Header(header) => {
                if cursor.len() < header.pdu_length {
                    return Ok(None);
                }

                let pdu = cursor.read(header.pdu_length)?.to_vec();
                self.state = ParseState::Begin;

                if self.level.enabled() {
                    tracing::info!("MBAP RX - {}", MbapDisplay::new(self.level, header.tx_id, header.unit_id, &pdu));
                }

                Ok(Some(Frame::new(header.tx_id, header.unit_id, pdu)))
            }
            ParseState::Begin => {
                if cursor.len() < constants::HEADER_LENGTH {
                    return Ok(None);
                }

                self.state = ParseState::Header(Self::parse_header(cursor)?);
                self.parse(cursor)
            }
        }
    }
}

/// Encode a frame, logging the MBAP header at the requested level
pub(crate) fn format_frame(
    tx_id: u16,
    unit_id: UnitId,
    pdu: &[u8],
    level: FrameDecodeLevel,
) -> Result<Vec<u8>, InternalError> {
    let bytes = encode(tx_id, unit_id, pdu)?;
    if level.enabled() {
        tracing::info!("MBAP TX - {}", MbapDisplay::new(level, tx_id, unit_id, pdu));
    }
    Ok(bytes)
}

struct MbapDisplay<'a> {
    level: FrameDecodeLevel,
    tx_id: u16,
    unit_id: UnitId,
    pdu: &'a [u8],
}

impl<'a> MbapDisplay<'a> {
    fn new(level: FrameDecodeLevel, tx_id: u16, unit_id: UnitId, pdu: &'a [u8]) -> Self {
        Self {
            level,
            tx_id,
            unit_id,
            pdu,
        }
    }
}

impl std::fmt::Display for MbapDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "tx_id: {:#06X} unit: {} len: {}",
            self.tx_id,
            self.unit_id,
            self.pdu.len()
        )?;
        if self.level.payload_enabled() {
            format_bytes(f, self.pdu)?;
        }
        Ok(())
    }
}

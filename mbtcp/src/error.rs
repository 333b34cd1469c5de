use crate::exception::ExceptionCode;

/// Top-level error type for client requests
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred
    Io(std::io::ErrorKind),
    /// A Modbus exception was returned by the server
    Exception(ExceptionCode),
    /// Request was not performed because it is invalid
    BadRequest(InvalidRequest),
    /// Unable to parse a frame from the stream
    BadFrame(FrameParseError),
    /// Response ADU is invalid
    BadResponse(AduParseError),
    /// An internal error occurred in the library itself
    Internal(InternalError),
    /// Timeout occurred before receiving a response from the server
    ResponseTimeout,
    /// The connection was closed while the request was outstanding
    ConnectionClosed,
    /// No connection exists to the Modbus server
    NoConnection,
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(kind) => std::io::Error::from(*kind).fmt(f),
            RequestError::Exception(err) => err.fmt(f),
            RequestError::BadRequest(err) => err.fmt(f),
            RequestError::BadFrame(err) => err.fmt(f),
            RequestError::BadResponse(err) => err.fmt(f),
            RequestError::Internal(err) => err.fmt(f),
            RequestError::ResponseTimeout => {
                f.write_str("timeout occurred before receiving a response from the server")
            }
            RequestError::ConnectionClosed => {
                f.write_str("connection was closed before the request completed")
            }
            RequestError::NoConnection => f.write_str("no connection exists to the Modbus server"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<InvalidRequest> for RequestError {
    fn from(err: InvalidRequest) -> Self {
        RequestError::BadRequest(err)
    }
}

impl From<InvalidRange> for RequestError {
    fn from(err: InvalidRange) -> Self {
        RequestError::BadRequest(err.into())
    }
}

impl From<InternalError> for RequestError {
    fn from(err: InternalError) -> Self {
        RequestError::Internal(err)
    }
}

impl From<AduParseError> for RequestError {
    fn from(err: AduParseError) -> Self {
        RequestError::BadResponse(err)
    }
}

impl From<ExceptionCode> for RequestError {
    fn from(err: ExceptionCode) -> Self {
        RequestError::Exception(err)
    }
}

impl From<FrameParseError> for RequestError {
    fn from(err: FrameParseError) -> Self {
        RequestError::BadFrame(err)
    }
}

/// Errors that indicate faulty logic in the library itself if they occur
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InternalError {
    /// Insufficient space for write operation
    InsufficientWriteSpace(usize, usize), // written vs remaining space
    /// The calculated PDU size exceeds what is allowed in a frame
    AduTooBig(usize),
    /// Attempted to read more bytes than present
    InsufficientBytesForRead(usize, usize), // requested vs remaining
    /// Byte count would exceed maximum allowed size in the ADU of u8
    BadByteCount(usize),
    /// Every transaction id is held by a pending request
    TransactionIdsExhausted,
    /// A lock protecting shared state was poisoned by a panicking thread
    PoisonedLock,
}

impl std::error::Error for InternalError {}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::InsufficientWriteSpace(written, remaining) => write!(
                f,
                "attempted to write {written} bytes with {remaining} bytes remaining"
            ),
            InternalError::AduTooBig(size) => write!(
                f,
                "ADU length of {} exceeds the maximum allowed length of {}",
                size,
                crate::frame::constants::MAX_PDU_LENGTH
            ),
            InternalError::InsufficientBytesForRead(requested, remaining) => write!(
                f,
                "attempted to read {requested} bytes with only {remaining} remaining"
            ),
            InternalError::BadByteCount(size) => {
                write!(f, "Byte count of {size} exceeds maximum size of u8")
            }
            InternalError::TransactionIdsExhausted => {
                f.write_str("every transaction id is held by a pending request")
            }
            InternalError::PoisonedLock => f.write_str("a lock on shared state was poisoned"),
        }
    }
}

/// Errors that occur while parsing a frame off a stream or out of a buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameParseError {
    /// Fewer than the 7 bytes of an MBAP header were available
    InsufficientHeader(usize),
    /// Received TCP frame with the length field set to zero
    MbapLengthZero,
    /// Received TCP frame with length that exceeds max allowed size
    MbapLengthTooBig(usize, usize), // actual size and the maximum size
    /// Received TCP frame within non-Modbus protocol id
    UnknownProtocolId(u16),
    /// The length field does not match the number of bytes that follow it
    LengthMismatch {
        /// value of the length field
        declared: usize,
        /// number of bytes actually present after the length field
        actual: usize,
    },
}

impl std::error::Error for FrameParseError {}

impl std::fmt::Display for FrameParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameParseError::InsufficientHeader(count) => write!(
                f,
                "Received {count} bytes which is too short for an MBAP header"
            ),
            FrameParseError::MbapLengthZero => {
                f.write_str("Received TCP frame with the length field set to zero")
            }
            FrameParseError::MbapLengthTooBig(size, max) => write!(
                f,
                "Received TCP frame with length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameParseError::UnknownProtocolId(id) => {
                write!(f, "Received TCP frame with non-Modbus protocol id: {id}")
            }
            FrameParseError::LengthMismatch { declared, actual } => write!(
                f,
                "Received TCP frame with length field ({declared}) that does not match the bytes present ({actual})"
            ),
        }
    }
}

/// Errors that occur while parsing requests and responses
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AduParseError {
    /// Response is too short to be valid
    InsufficientBytes,
    /// Byte count doesn't match what is expected based on request
    RequestByteCountMismatch(usize, usize), // expected count / actual count
    /// Response contains extra trailing bytes
    TrailingBytes(usize),
    /// A parameter expected to be echoed in the reply did not match
    ReplyEchoMismatch,
    /// An unknown response function code was received
    UnknownResponseFunction(u8, u8, u8), // actual, expected, expected error
    /// Bad value for the coil state
    UnknownCoilState(u16),
}

impl std::error::Error for AduParseError {}

impl std::fmt::Display for AduParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AduParseError::InsufficientBytes => f.write_str("response is too short to be valid"),
            AduParseError::RequestByteCountMismatch(request, response) => write!(
                f,
                "byte count ({response}) doesn't match what is expected based on request ({request})"
            ),
            AduParseError::TrailingBytes(remaining) => {
                write!(f, "response contains {remaining} extra trailing bytes")
            }
            AduParseError::ReplyEchoMismatch => {
                f.write_str("a parameter expected to be echoed in the reply did not match")
            }
            AduParseError::UnknownResponseFunction(actual, expected, error) => write!(
                f,
                "received unknown response function code: {actual}. Expected {expected} or {error}"
            ),
            AduParseError::UnknownCoilState(value) => write!(
                f,
                "received coil state with unspecified value: 0x{value:04X}"
            ),
        }
    }
}

/// Errors that result because of bad request parameter
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    /// Request contained an invalid range
    BadRange(InvalidRange),
    /// Count is too big to fit in a u16
    CountTooBigForU16(usize),
    /// Count too big for specific request
    CountTooBigForType(u16, u16),
}

impl std::error::Error for InvalidRequest {}

impl std::fmt::Display for InvalidRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRequest::BadRange(err) => write!(f, "{err}"),
            InvalidRequest::CountTooBigForU16(count) => write!(
                f,
                "The requested count of objects exceeds the maximum value of u16: {count}"
            ),
            InvalidRequest::CountTooBigForType(count, max) => write!(
                f,
                "the request count of {count} exceeds maximum allowed count of {max} for this type"
            ),
        }
    }
}

impl From<InvalidRange> for InvalidRequest {
    fn from(x: InvalidRange) -> Self {
        InvalidRequest::BadRange(x)
    }
}

/// Errors that can be produced when validating start/count
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidRange {
    /// Count of zero not allowed
    CountOfZero,
    /// Address in range overflows u16
    AddressOverflow(u16, u16),
}

impl std::error::Error for InvalidRange {}

impl std::fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRange::CountOfZero => f.write_str("range contains count == 0"),
            InvalidRange::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count = {count} would overflow the representation of u16"
            ),
        }
    }
}

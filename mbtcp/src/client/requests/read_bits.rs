use crate::client::service::{ReadCoils, ReadDiscreteInputs, Service};
use crate::common::bits::{num_bytes_for_bits, unpack_bits};
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::AddressRange;

fn parse_bits_response(range: &AddressRange, cursor: &mut ReadCursor) -> Result<Vec<bool>, RequestError> {
    let expected = num_bytes_for_bits(range.count);
    let actual = cursor.read_u8()? as usize;
    if actual != expected {
        return Err(AduParseError::RequestByteCountMismatch(expected, actual).into());
    }
    // padding bits in the last byte are dropped
    Ok(unpack_bits(cursor.read_bytes(actual)?, range.count))
}

impl Service for ReadCoils {
    const FUNCTION: FunctionCode = FunctionCode::ReadCoils;

    type Request = AddressRange;
    type Response = Vec<bool>;

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.of_read_bits()?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_bits_response(request, cursor)
    }
}

impl Service for ReadDiscreteInputs {
    const FUNCTION: FunctionCode = FunctionCode::ReadDiscreteInputs;

    type Request = AddressRange;
    type Response = Vec<bool>;

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.of_read_bits()?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_bits_response(request, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::service::parse_reply;

    fn range(start: u16, count: u16) -> AddressRange {
        AddressRange::try_from(start, count).unwrap()
    }

    #[test]
    fn truncates_padding_bits() {
        assert_eq!(
            parse_reply::<ReadCoils>(&range(0, 3), &[0x01, 0x01, 0xFD]),
            Ok(vec![true, false, true])
        );
    }

    #[test]
    fn spans_multiple_bytes() {
        let bits = parse_reply::<ReadDiscreteInputs>(&range(0, 10), &[0x02, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(bits.len(), 10);
        assert!(bits[0]);
        assert!(bits[9]);
        assert_eq!(bits.iter().filter(|x| **x).count(), 2);
    }

    #[test]
    fn rejects_unexpected_byte_count() {
        assert_eq!(
            parse_reply::<ReadCoils>(&range(0, 3), &[0x01, 0x02, 0x05, 0x00]),
            Err(AduParseError::RequestByteCountMismatch(1, 2).into())
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        assert_eq!(
            parse_reply::<ReadCoils>(&range(0, 3), &[0x01, 0x01, 0x05, 0x00]),
            Err(AduParseError::TrailingBytes(1).into())
        );
    }

    #[test]
    fn rejects_count_above_limit() {
        assert_eq!(
            ReadCoils::check_request_validity(&range(0, 0x07D1)),
            Err(InvalidRequest::CountTooBigForType(0x07D1, 0x07D0))
        );
        assert!(ReadDiscreteInputs::check_request_validity(&range(0, 0x07D0)).is_ok());
    }
}

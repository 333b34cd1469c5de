use crate::client::service::{Service, WriteMultipleCoils, WriteMultipleRegisters};
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::constants::limits;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::WriteMultiple;

fn parse_range_echo<T>(request: &WriteMultiple<T>, cursor: &mut ReadCursor) -> Result<(), RequestError> {
    // read the raw values so a bogus count of zero is reported as a mismatch
    let start = cursor.read_u16_be()?;
    let count = cursor.read_u16_be()?;
    let range = request.range();
    if start != range.start || count != range.count {
        return Err(AduParseError::ReplyEchoMismatch.into());
    }
    Ok(())
}

impl Service for WriteMultipleCoils {
    const FUNCTION: FunctionCode = FunctionCode::WriteMultipleCoils;

    type Request = WriteMultiple<bool>;
    type Response = ();

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.range().limited(limits::MAX_WRITE_COILS_COUNT)?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_range_echo(request, cursor)
    }
}

impl Service for WriteMultipleRegisters {
    const FUNCTION: FunctionCode = FunctionCode::WriteMultipleRegisters;

    type Request = WriteMultiple<u16>;
    type Response = ();

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.range().limited(limits::MAX_WRITE_REGISTERS_COUNT)?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_range_echo(request, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::service::parse_reply;

    #[test]
    fn accepts_range_echo() {
        let request = WriteMultiple::from(10, vec![100u16, 200, 300, 400, 500]).unwrap();
        assert_eq!(
            parse_reply::<WriteMultipleRegisters>(&request, &[0x10, 0x00, 0x0A, 0x00, 0x05]),
            Ok(())
        );
    }

    #[test]
    fn rejects_range_mismatch() {
        let request = WriteMultiple::from(0, vec![true, false]).unwrap();
        assert_eq!(
            parse_reply::<WriteMultipleCoils>(&request, &[0x0F, 0x00, 0x00, 0x00, 0x00]),
            Err(AduParseError::ReplyEchoMismatch.into())
        );
    }

    #[test]
    fn rejects_too_many_values() {
        let request = WriteMultiple::from(0, vec![0u16; 124]).unwrap();
        assert_eq!(
            WriteMultipleRegisters::check_request_validity(&request),
            Err(InvalidRequest::CountTooBigForType(124, 123))
        );
        let request = WriteMultiple::from(0, vec![false; 0x07B1]).unwrap();
        assert!(WriteMultipleCoils::check_request_validity(&request).is_err());
    }
}

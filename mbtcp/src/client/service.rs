use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::frame::constants::MAX_PDU_LENGTH;

/*
 Empty structs that serve as concrete types for each client operation

 Each type has an implementation of the Service trait in the requests module
*/

pub(crate) struct ReadCoils;
pub(crate) struct ReadDiscreteInputs;
pub(crate) struct ReadHoldingRegisters;
pub(crate) struct ReadInputRegisters;
pub(crate) struct WriteSingleCoil;
pub(crate) struct WriteSingleRegister;
pub(crate) struct WriteMultipleCoils;
pub(crate) struct WriteMultipleRegisters;

/// A request/response pair the client knows how to send and parse
pub(crate) trait Service {
    const FUNCTION: FunctionCode;

    type Request: Serialize + std::fmt::Display;
    type Response;

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest>;

    /// Parse the body of a normal response, the function code has already been consumed
    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError>;
}

/// Build the request PDU, function code included
pub(crate) fn serialize_request<S: Service>(request: &S::Request) -> Result<Vec<u8>, RequestError> {
    let mut buffer = [0u8; MAX_PDU_LENGTH];
    let mut cursor = WriteCursor::new(&mut buffer);
    cursor.write_u8(S::FUNCTION.get_value())?;
    request.serialize(&mut cursor)?;
    Ok(cursor.written().to_vec())
}

/// Interpret a response PDU, mapping exception responses onto `RequestError::Exception`
pub(crate) fn parse_reply<S: Service>(
    request: &S::Request,
    pdu: &[u8],
) -> Result<S::Response, RequestError> {
    let mut cursor = ReadCursor::new(pdu);
    let function = cursor.read_u8()?;

    if function == S::FUNCTION.get_value() {
        let response = S::parse_response(request, &mut cursor)?;
        cursor.expect_empty()?;
        return Ok(response);
    }

    if function == S::FUNCTION.as_error() {
        let code = cursor.read_u8()?;
        cursor.expect_empty()?;
        return Err(RequestError::Exception(code.into()));
    }

    Err(AduParseError::UnknownResponseFunction(
        function,
        S::FUNCTION.get_value(),
        S::FUNCTION.as_error(),
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ExceptionCode;
    use crate::types::{AddressRange, Indexed, WriteMultiple};

    fn range(start: u16, count: u16) -> AddressRange {
        AddressRange::try_from(start, count).unwrap()
    }

    #[test]
    fn serializes_read_request() {
        assert_eq!(
            serialize_request::<ReadHoldingRegisters>(&range(10, 5)).unwrap(),
            vec![0x03, 0x00, 0x0A, 0x00, 0x05]
        );
    }

    #[test]
    fn serializes_write_single_coil_request() {
        assert_eq!(
            serialize_request::<WriteSingleCoil>(&Indexed::new(0, true)).unwrap(),
            vec![0x05, 0x00, 0x00, 0xFF, 0x00]
        );
    }

    #[test]
    fn largest_write_requests_fit_in_a_pdu() {
        let coils = WriteMultiple::from(0, vec![true; 0x07B0]).unwrap();
        assert_eq!(
            serialize_request::<WriteMultipleCoils>(&coils).unwrap().len(),
            6 + 0x07B0 / 8
        );
        let registers = WriteMultiple::from(0, vec![0u16; 0x7B]).unwrap();
        assert_eq!(
            serialize_request::<WriteMultipleRegisters>(&registers)
                .unwrap()
                .len(),
            6 + 2 * 0x7B
        );
    }

    #[test]
    fn maps_exception_response() {
        assert_eq!(
            parse_reply::<ReadHoldingRegisters>(&range(95, 10), &[0x83, 0x02]),
            Err(RequestError::Exception(ExceptionCode::IllegalDataAddress))
        );
    }

    #[test]
    fn maps_unknown_exception_code() {
        assert_eq!(
            parse_reply::<ReadCoils>(&range(0, 1), &[0x81, 0x0B]),
            Err(RequestError::Exception(ExceptionCode::Unknown(0x0B)))
        );
    }

    #[test]
    fn rejects_response_for_other_function() {
        assert_eq!(
            parse_reply::<ReadHoldingRegisters>(&range(0, 1), &[0x04, 0x02, 0x00, 0x01]),
            Err(AduParseError::UnknownResponseFunction(0x04, 0x03, 0x83).into())
        );
    }

    #[test]
    fn rejects_empty_response() {
        assert_eq!(
            parse_reply::<ReadCoils>(&range(0, 1), &[]),
            Err(AduParseError::InsufficientBytes.into())
        );
    }
}

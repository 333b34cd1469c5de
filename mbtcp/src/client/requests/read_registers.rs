use crate::client::service::{ReadHoldingRegisters, ReadInputRegisters, Service};
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::AddressRange;

fn parse_registers_response(
    range: &AddressRange,
    cursor: &mut ReadCursor,
) -> Result<Vec<u16>, RequestError> {
    let expected = 2 * range.count as usize;
    let actual = cursor.read_u8()? as usize;
    if actual != expected {
        return Err(AduParseError::RequestByteCountMismatch(expected, actual).into());
    }

    let mut values = Vec::with_capacity(range.count as usize);
    for _ in 0..range.count {
        values.push(cursor.read_u16_be()?);
    }
    Ok(values)
}

impl Service for ReadHoldingRegisters {
    const FUNCTION: FunctionCode = FunctionCode::ReadHoldingRegisters;

    type Request = AddressRange;
    type Response = Vec<u16>;

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.of_read_registers()?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_registers_response(request, cursor)
    }
}

impl Service for ReadInputRegisters {
    const FUNCTION: FunctionCode = FunctionCode::ReadInputRegisters;

    type Request = AddressRange;
    type Response = Vec<u16>;

    fn check_request_validity(request: &Self::Request) -> Result<(), InvalidRequest> {
        request.of_read_registers()?;
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_registers_response(request, cursor)
    }
}

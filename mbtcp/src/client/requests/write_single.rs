use crate::client::service::{Service, WriteSingleCoil, WriteSingleRegister};
use crate::common::cursor::ReadCursor;
use crate::common::function::FunctionCode;
use crate::common::traits::Parse;
use crate::error::{AduParseError, InvalidRequest, RequestError};
use crate::types::Indexed;

fn parse_echo<T>(request: &Indexed<T>, cursor: &mut ReadCursor) -> Result<(), RequestError>
where
    Indexed<T>: Parse + PartialEq,
{
    let response = Indexed::<T>::parse(cursor)?;
    if *request != response {
        return Err(AduParseError::ReplyEchoMismatch.into());
    }
    Ok(())
}

impl Service for WriteSingleCoil {
    const FUNCTION: FunctionCode = FunctionCode::WriteSingleCoil;

    type Request = Indexed<bool>;
    type Response = ();

    fn check_request_validity(_: &Self::Request) -> Result<(), InvalidRequest> {
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_echo(request, cursor)
    }
}

impl Service for WriteSingleRegister {
    const FUNCTION: FunctionCode = FunctionCode::WriteSingleRegister;

    type Request = Indexed<u16>;
    type Response = ();

    fn check_request_validity(_: &Self::Request) -> Result<(), InvalidRequest> {
        Ok(())
    }

    fn parse_response(
        request: &Self::Request,
        cursor: &mut ReadCursor,
    ) -> Result<Self::Response, RequestError> {
        parse_echo(request, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::service::parse_reply;

    #[test]
    fn accepts_exact_echo() {
        assert_eq!(
            parse_reply::<WriteSingleRegister>(&Indexed::new(0, 1234), &[0x06, 0x00, 0x00, 0x04, 0xD2]),
            Ok(())
        );
        assert_eq!(
            parse_reply::<WriteSingleCoil>(&Indexed::new(7, true), &[0x05, 0x00, 0x07, 0xFF, 0x00]),
            Ok(())
        );
    }

    #[test]
    fn rejects_echo_of_different_value() {
        assert_eq!(
            parse_reply::<WriteSingleRegister>(&Indexed::new(0, 1234), &[0x06, 0x00, 0x00, 0x00, 0x01]),
            Err(AduParseError::ReplyEchoMismatch.into())
        );
    }

    #[test]
    fn rejects_bad_coil_state_in_echo() {
        assert_eq!(
            parse_reply::<WriteSingleCoil>(&Indexed::new(0, true), &[0x05, 0x00, 0x00, 0x12, 0x34]),
            Err(AduParseError::UnknownCoilState(0x1234).into())
        );
    }
}

use std::sync::Arc;

use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::{FunctionCode, ERROR_BIT};
use crate::decode::AppDecodeLevel;
use crate::exception::ExceptionCode;
use crate::frame::constants::MAX_PDU_LENGTH;
use crate::server::datastore::Datastore;
use crate::server::request::{Request, RequestDisplay};

/// Maps request PDUs onto datastore operations and builds the response PDU
///
/// Every input produces exactly one response: either the normal reply for
/// the function or an exception PDU (`function | 0x80`, exception code).
#[derive(Clone)]
pub struct RequestRouter {
    datastore: Arc<Datastore>,
    level: AppDecodeLevel,
}

impl RequestRouter {
    /// Create a router over a shared datastore
    pub fn new(datastore: Arc<Datastore>, level: AppDecodeLevel) -> Self {
        Self { datastore, level }
    }

    /// The datastore requests are applied to
    pub fn datastore(&self) -> &Arc<Datastore> {
        &self.datastore
    }

    /// Process a request PDU and return the response PDU
    pub fn process(&self, pdu: &[u8]) -> Vec<u8> {
        let mut cursor = ReadCursor::new(pdu);

        let raw = match cursor.read_u8() {
            Ok(x) => x,
            Err(_) => {
                tracing::warn!("received request without a function code");
                return self.exception(ERROR_BIT, ExceptionCode::IllegalFunction);
            }
        };

        let function = match FunctionCode::get(raw) {
            Some(x) => x,
            None => {
                tracing::warn!("received unknown function code: {:#04X}", raw);
                return self.exception(raw | ERROR_BIT, ExceptionCode::IllegalFunction);
            }
        };

        let request = match Request::parse(function, &mut cursor, &self.datastore) {
            Ok(x) => x,
            Err(ex) => {
                tracing::warn!("rejected {}: {:?}", function, ex);
                return self.exception(function.as_error(), ex);
            }
        };

        if self.level.enabled() {
            tracing::info!("PDU RX - {}", RequestDisplay::new(self.level, &request));
        }

        match self.reply(function, &request) {
            Ok(reply) => {
                if self.level.enabled() {
                    tracing::info!("PDU TX - {} ({} bytes)", function, reply.len());
                }
                reply
            }
            Err(ex) => self.exception(function.as_error(), ex),
        }
    }

    fn reply(&self, function: FunctionCode, request: &Request) -> Result<Vec<u8>, ExceptionCode> {
        let mut buffer = [0u8; MAX_PDU_LENGTH];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor
            .write_u8(function.get_value())
            .map_err(|_| ExceptionCode::ServerDeviceFailure)?;
        request.execute(&self.datastore, &mut cursor)?;
        Ok(cursor.written().to_vec())
    }

    fn exception(&self, function: u8, ex: ExceptionCode) -> Vec<u8> {
        if self.level.enabled() {
            tracing::warn!("PDU TX - Modbus exception {:?} ({:#04X})", ex, u8::from(ex));
        }
        vec![function, ex.into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::datastore::{BitTable, RegisterTable};
    use crate::types::AddressRange;

    fn router() -> RequestRouter {
        RequestRouter::new(Arc::new(Datastore::new(100)), AppDecodeLevel::Nothing)
    }

    #[test]
    fn unknown_function_is_illegal() {
        assert_eq!(router().process(&[0x07]), vec![0x87, 0x01]);
        assert_eq!(router().process(&[0x2B, 0x0E, 0x01, 0x00]), vec![0xAB, 0x01]);
    }

    #[test]
    fn empty_pdu_is_answered() {
        assert_eq!(router().process(&[]), vec![0x80, 0x01]);
    }

    #[test]
    fn read_beyond_capacity_is_an_illegal_address() {
        assert_eq!(
            router().process(&[0x03, 0x00, 95, 0x00, 10]),
            vec![0x83, 0x02]
        );
    }

    #[test]
    fn read_up_to_capacity_succeeds() {
        let reply = router().process(&[0x03, 0x00, 95, 0x00, 5]);
        assert_eq!(reply, vec![0x03, 0x0A, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn byte_count_mismatch_is_an_illegal_value() {
        assert_eq!(
            router().process(&[0x10, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x01]),
            vec![0x90, 0x03]
        );
    }

    #[test]
    fn single_register_write_is_echoed_and_stored() {
        let router = router();
        let request = [0x06, 0x00, 0x00, 0x04, 0xD2];
        assert_eq!(router.process(&request), request.to_vec());
        assert_eq!(
            router
                .datastore()
                .read_registers(RegisterTable::HoldingRegisters, AddressRange::try_from(0, 1).unwrap()),
            Ok(vec![1234])
        );
    }

    #[test]
    fn single_coil_write_is_echoed_and_stored() {
        let router = router();
        let request = [0x05, 0x00, 0x03, 0xFF, 0x00];
        assert_eq!(router.process(&request), request.to_vec());
        assert_eq!(router.process(&[0x01, 0x00, 0x00, 0x00, 0x05]), vec![0x01, 0x01, 0x08]);
    }

    #[test]
    fn write_multiple_replies_with_range() {
        let router = router();
        let request = [
            0x10, 0x00, 0x0A, 0x00, 0x05, 0x0A, 0x00, 100, 0x00, 200, 0x01, 0x2C, 0x01, 0x90,
            0x01, 0xF4,
        ];
        assert_eq!(router.process(&request), vec![0x10, 0x00, 0x0A, 0x00, 0x05]);
        assert_eq!(
            router.process(&[0x03, 0x00, 0x0A, 0x00, 0x05]),
            vec![0x03, 0x0A, 0x00, 100, 0x00, 200, 0x01, 0x2C, 0x01, 0x90, 0x01, 0xF4]
        );
    }

    #[test]
    fn write_multiple_coils_then_read_pads_last_byte() {
        let router = router();
        assert_eq!(
            router.process(&[0x0F, 0x00, 0x00, 0x00, 0x0A, 0x02, 0xFF, 0x03]),
            vec![0x0F, 0x00, 0x00, 0x00, 0x0A]
        );
        // ten coils written, reading eleven shows the eleventh is still clear
        assert_eq!(
            router.process(&[0x01, 0x00, 0x00, 0x00, 0x0B]),
            vec![0x01, 0x02, 0xFF, 0x03]
        );
    }

    #[test]
    fn read_only_banks_are_served() {
        let router = router();
        router
            .datastore()
            .update_bits(BitTable::DiscreteInputs, |bits| bits[1] = true)
            .unwrap();
        router
            .datastore()
            .update_registers(RegisterTable::InputRegisters, |regs| regs[0] = 0xCAFE)
            .unwrap();
        assert_eq!(router.process(&[0x02, 0x00, 0x00, 0x00, 0x02]), vec![0x02, 0x01, 0x02]);
        assert_eq!(
            router.process(&[0x04, 0x00, 0x00, 0x00, 0x01]),
            vec![0x04, 0x02, 0xCA, 0xFE]
        );
    }
}

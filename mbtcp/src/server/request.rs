use crate::common::bits::{num_bytes_for_bits, unpack_bits};
use crate::common::cursor::{ReadCursor, WriteCursor};
use crate::common::function::FunctionCode;
use crate::common::traits::Serialize;
use crate::constants::limits;
use crate::decode::AppDecodeLevel;
use crate::error::{AduParseError, InternalError};
use crate::exception::ExceptionCode;
use crate::server::datastore::{BitTable, Datastore, RegisterTable};
use crate::types::{coil_from_u16, AddressRange, Indexed, WriteMultiple};

/// A request that passed validation against the datastore's shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    ReadCoils(AddressRange),
    ReadDiscreteInputs(AddressRange),
    ReadHoldingRegisters(AddressRange),
    ReadInputRegisters(AddressRange),
    WriteSingleCoil(Indexed<bool>),
    WriteSingleRegister(Indexed<u16>),
    WriteMultipleCoils(WriteMultiple<bool>),
    WriteMultipleRegisters(WriteMultiple<u16>),
}

fn malformed(_: AduParseError) -> ExceptionCode {
    ExceptionCode::IllegalDataValue
}

fn internal(err: InternalError) -> ExceptionCode {
    tracing::error!("unable to serialize response: {}", err);
    ExceptionCode::ServerDeviceFailure
}

fn check_address(start: u16, count: u16, capacity: usize) -> Result<(), ExceptionCode> {
    if start as usize + count as usize > capacity {
        return Err(ExceptionCode::IllegalDataAddress);
    }
    Ok(())
}

fn check_count(count: u16, max: u16) -> Result<(), ExceptionCode> {
    if count == 0 || count > max {
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(())
}

fn to_range(start: u16, count: u16) -> Result<AddressRange, ExceptionCode> {
    AddressRange::try_from(start, count).map_err(|_| ExceptionCode::IllegalDataValue)
}

// start address and quantity that lead every read and write multiple request
fn read_header(cursor: &mut ReadCursor) -> Result<(u16, u16), ExceptionCode> {
    let start = cursor.read_u16_be().map_err(malformed)?;
    let count = cursor.read_u16_be().map_err(malformed)?;
    Ok((start, count))
}

fn parse_read(
    cursor: &mut ReadCursor,
    capacity: usize,
    max: u16,
) -> Result<AddressRange, ExceptionCode> {
    let (start, count) = read_header(cursor)?;
    check_address(start, count, capacity)?;
    check_count(count, max)?;
    cursor.expect_empty().map_err(malformed)?;
    to_range(start, count)
}

// returns the values bytes after checking the byte count against the quantity
fn parse_write_multiple<'a>(
    cursor: &mut ReadCursor<'a>,
    capacity: usize,
    max: u16,
    bytes_for_count: fn(u16) -> usize,
) -> Result<(u16, u16, &'a [u8]), ExceptionCode> {
    let (start, count) = read_header(cursor)?;
    check_address(start, count, capacity)?;
    check_count(count, max)?;
    let byte_count = cursor.read_u8().map_err(malformed)? as usize;
    if byte_count != bytes_for_count(count) {
        return Err(ExceptionCode::IllegalDataValue);
    }
    let bytes = cursor.read_bytes(byte_count).map_err(malformed)?;
    cursor.expect_empty().map_err(malformed)?;
    Ok((start, count, bytes))
}

impl Request {
    pub(crate) fn get_function(&self) -> FunctionCode {
        match self {
            Request::ReadCoils(_) => FunctionCode::ReadCoils,
            Request::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Request::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Request::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Request::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Request::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Request::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Parse the body that follows the function code
    ///
    /// Address checks against the bank capacity come before checks of the
    /// quantity and payload, so each failure maps to exactly one exception.
    pub(crate) fn parse(
        function: FunctionCode,
        cursor: &mut ReadCursor,
        store: &Datastore,
    ) -> Result<Self, ExceptionCode> {
        match function {
            FunctionCode::ReadCoils => Ok(Request::ReadCoils(parse_read(
                cursor,
                store.bit_capacity(BitTable::Coils),
                limits::MAX_READ_COILS_COUNT,
            )?)),
            FunctionCode::ReadDiscreteInputs => Ok(Request::ReadDiscreteInputs(parse_read(
                cursor,
                store.bit_capacity(BitTable::DiscreteInputs),
                limits::MAX_READ_COILS_COUNT,
            )?)),
            FunctionCode::ReadHoldingRegisters => Ok(Request::ReadHoldingRegisters(parse_read(
                cursor,
                store.register_capacity(RegisterTable::HoldingRegisters),
                limits::MAX_READ_REGISTERS_COUNT,
            )?)),
            FunctionCode::ReadInputRegisters => Ok(Request::ReadInputRegisters(parse_read(
                cursor,
                store.register_capacity(RegisterTable::InputRegisters),
                limits::MAX_READ_REGISTERS_COUNT,
            )?)),
            FunctionCode::WriteSingleCoil => {
                let (index, raw) = read_header(cursor)?;
                check_address(index, 1, store.bit_capacity(BitTable::Coils))?;
                let value = coil_from_u16(raw).map_err(malformed)?;
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::WriteSingleCoil(Indexed::new(index, value)))
            }
            FunctionCode::WriteSingleRegister => {
                let (index, value) = read_header(cursor)?;
                check_address(
                    index,
                    1,
                    store.register_capacity(RegisterTable::HoldingRegisters),
                )?;
                cursor.expect_empty().map_err(malformed)?;
                Ok(Request::WriteSingleRegister(Indexed::new(index, value)))
            }
            FunctionCode::WriteMultipleCoils => {
                let (start, count, bytes) = parse_write_multiple(
                    cursor,
                    store.bit_capacity(BitTable::Coils),
                    limits::MAX_WRITE_COILS_COUNT,
                    num_bytes_for_bits,
                )?;
                let values = unpack_bits(bytes, count);
                Ok(Request::WriteMultipleCoils(
                    WriteMultiple::from(start, values).map_err(|_| ExceptionCode::IllegalDataValue)?,
                ))
            }
            FunctionCode::WriteMultipleRegisters => {
                let (start, _, bytes) = parse_write_multiple(
                    cursor,
                    store.register_capacity(RegisterTable::HoldingRegisters),
                    limits::MAX_WRITE_REGISTERS_COUNT,
                    |count| 2 * count as usize,
                )?;
                let values = bytes
                    .chunks_exact(2)
                    .map(|x| u16::from_be_bytes([x[0], x[1]]))
                    .collect();
                Ok(Request::WriteMultipleRegisters(
                    WriteMultiple::from(start, values).map_err(|_| ExceptionCode::IllegalDataValue)?,
                ))
            }
        }
    }

    /// Apply the request to the datastore and write the body of the reply
    pub(crate) fn execute(
        &self,
        store: &Datastore,
        cursor: &mut WriteCursor,
    ) -> Result<(), ExceptionCode> {
        match self {
            Request::ReadCoils(range) => store
                .read_bits(BitTable::Coils, *range)?
                .as_slice()
                .serialize(cursor)
                .map_err(internal),
            Request::ReadDiscreteInputs(range) => store
                .read_bits(BitTable::DiscreteInputs, *range)?
                .as_slice()
                .serialize(cursor)
                .map_err(internal),
            Request::ReadHoldingRegisters(range) => store
                .read_registers(RegisterTable::HoldingRegisters, *range)?
                .as_slice()
                .serialize(cursor)
                .map_err(internal),
            Request::ReadInputRegisters(range) => store
                .read_registers(RegisterTable::InputRegisters, *range)?
                .as_slice()
                .serialize(cursor)
                .map_err(internal),
            Request::WriteSingleCoil(value) => {
                store.write_bits(BitTable::Coils, value.index, &[value.value])?;
                value.serialize(cursor).map_err(internal)
            }
            Request::WriteSingleRegister(value) => {
                store.write_registers(RegisterTable::HoldingRegisters, value.index, &[value.value])?;
                value.serialize(cursor).map_err(internal)
            }
            Request::WriteMultipleCoils(items) => {
                store.write_bits(BitTable::Coils, items.range.start, items.values())?;
                items.range.serialize(cursor).map_err(internal)
            }
            Request::WriteMultipleRegisters(items) => {
                store.write_registers(
                    RegisterTable::HoldingRegisters,
                    items.range.start,
                    items.values(),
                )?;
                items.range.serialize(cursor).map_err(internal)
            }
        }
    }
}

pub(crate) struct RequestDisplay<'a> {
    request: &'a Request,
    level: AppDecodeLevel,
}

impl<'a> RequestDisplay<'a> {
    pub(crate) fn new(level: AppDecodeLevel, request: &'a Request) -> Self {
        Self { request, level }
    }
}

impl std::fmt::Display for RequestDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.request.get_function())?;

        if self.level.data_headers() {
            match self.request {
                Request::ReadCoils(range)
                | Request::ReadDiscreteInputs(range)
                | Request::ReadHoldingRegisters(range)
                | Request::ReadInputRegisters(range) => write!(f, " {range}")?,
                Request::WriteSingleCoil(x) => write!(f, " {x}")?,
                Request::WriteSingleRegister(x) => write!(f, " {x}")?,
                Request::WriteMultipleCoils(items) => {
                    write!(f, " {}", items.range)?;
                    if self.level.data_values() {
                        for (index, value) in items.range.iter().zip(items.values()) {
                            write!(f, "\n{}", Indexed::new(index, *value))?;
                        }
                    }
                }
                Request::WriteMultipleRegisters(items) => {
                    write!(f, " {}", items.range)?;
                    if self.level.data_values() {
                        for (index, value) in items.range.iter().zip(items.values()) {
                            write!(f, "\n{}", Indexed::new(index, *value))?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

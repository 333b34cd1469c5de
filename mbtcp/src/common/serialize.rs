use crate::common::bits::pack_bits;
use crate::common::cursor::WriteCursor;
use crate::common::traits::Serialize;
use crate::error::InternalError;
use crate::exception::ExceptionCode;
use crate::types::{coil_to_u16, AddressRange, Indexed, WriteMultiple};

pub(crate) fn calc_bytes_for_bits(num_bits: usize) -> Result<u8, InternalError> {
    let count = num_bits.div_ceil(8);
    u8::try_from(count).map_err(|_| InternalError::BadByteCount(count))
}

pub(crate) fn calc_bytes_for_registers(num_registers: usize) -> Result<u8, InternalError> {
    let count = 2 * num_registers;
    u8::try_from(count).map_err(|_| InternalError::BadByteCount(count))
}

impl Serialize for AddressRange {
    fn serialize(&self, cur: &mut WriteCursor) -> Result<(), InternalError> {
        cur.write_u16_be(self.start)?;
        cur.write_u16_be(self.count)?;
        Ok(())
    }
}

impl Serialize for ExceptionCode {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        cursor.write_u8((*self).into())
    }
}

impl Serialize for Indexed<bool> {
    fn serialize(&self, cur: &mut WriteCursor) -> Result<(), InternalError> {
        cur.write_u16_be(self.index)?;
        cur.write_u16_be(coil_to_u16(self.value))?;
        Ok(())
    }
}

impl Serialize for Indexed<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        cursor.write_u16_be(self.index)?;
        cursor.write_u16_be(self.value)?;
        Ok(())
    }
}

/// byte count followed by the bits packed LSB first
impl Serialize for [bool] {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        let num_bytes = calc_bytes_for_bits(self.len())?;
        cursor.write_u8(num_bytes)?;
        cursor.write_bytes(&pack_bits(self))
    }
}

/// byte count followed by the big-endian registers
impl Serialize for [u16] {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        let num_bytes = calc_bytes_for_registers(self.len())?;
        cursor.write_u8(num_bytes)?;

        for value in self {
            cursor.write_u16_be(*value)?
        }

        Ok(())
    }
}

impl Serialize for WriteMultiple<bool> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        self.range.serialize(cursor)?;
        self.values.as_slice().serialize(cursor)
    }
}

impl Serialize for WriteMultiple<u16> {
    fn serialize(&self, cursor: &mut WriteCursor) -> Result<(), InternalError> {
        self.range.serialize(cursor)?;
        self.values.as_slice().serialize(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
        let mut buffer = [0u8; 32];
        let mut cursor = WriteCursor::new(&mut buffer);
        value.serialize(&mut cursor).unwrap();
        cursor.written().to_vec()
    }

    #[test]
    fn serializes_address_range() {
        let range = AddressRange::try_from(3, 512).unwrap();
        assert_eq!(serialize(&range), [0x00, 0x03, 0x02, 0x00]);
    }

    #[test]
    fn serializes_coil_as_on_off_value() {
        assert_eq!(serialize(&Indexed::new(1, true)), [0x00, 0x01, 0xFF, 0x00]);
        assert_eq!(serialize(&Indexed::new(1, false)), [0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn serializes_write_multiple_registers() {
        let request = WriteMultiple::from(10, vec![100u16, 0xCAFE]).unwrap();
        assert_eq!(
            serialize(&request),
            [0x00, 0x0A, 0x00, 0x02, 0x04, 0x00, 0x64, 0xCA, 0xFE]
        );
    }

    #[test]
    fn serializes_write_multiple_coils() {
        let request = WriteMultiple::from(1, vec![true, false, true]).unwrap();
        assert_eq!(serialize(&request), [0x00, 0x01, 0x00, 0x03, 0x01, 0x05]);
    }

    #[test]
    fn byte_count_must_fit_in_u8() {
        assert_eq!(calc_bytes_for_registers(127), Ok(254));
        assert_eq!(
            calc_bytes_for_registers(128),
            Err(InternalError::BadByteCount(256))
        );
    }
}

use crate::error::{AduParseError, InternalError};

/// Writes big-endian values into a fixed-size buffer
pub(crate) struct WriteCursor<'a> {
    dest: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub(crate) fn new(dest: &'a mut [u8]) -> WriteCursor<'a> {
        WriteCursor { dest, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.dest.len() - self.pos
    }

    /// bytes written so far
    pub(crate) fn written(&self) -> &[u8] {
        &self.dest[..self.pos]
    }

    pub(crate) fn write_u8(&mut self, value: u8) -> Result<(), InternalError> {
        match self.dest.get_mut(self.pos) {
            Some(x) => {
                *x = value;
                self.pos += 1;
                Ok(())
            }
            None => Err(InternalError::InsufficientWriteSpace(1, 0)),
        }
    }

    pub(crate) fn write_u16_be(&mut self, value: u16) -> Result<(), InternalError> {
        if self.remaining() < 2 {
            // don't write any bytes if there's isn't space for the whole thing
            return Err(InternalError::InsufficientWriteSpace(2, self.remaining()));
        }
        let [upper, lower] = value.to_be_bytes();
        self.write_u8(upper)?;
        self.write_u8(lower)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), InternalError> {
        let end = self.pos + bytes.len();
        match self.dest.get_mut(self.pos..end) {
            Some(x) => {
                x.copy_from_slice(bytes);
                self.pos = end;
                Ok(())
            }
            None => Err(InternalError::InsufficientWriteSpace(
                bytes.len(),
                self.remaining(),
            )),
        }
    }
}

/// Reads big-endian values out of a borrowed PDU
pub(crate) struct ReadCursor<'a> {
    src: &'a [u8],
}

impl<'a> ReadCursor<'a> {
    pub(crate) fn new(src: &'a [u8]) -> ReadCursor<'a> {
        ReadCursor { src }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.src.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    pub(crate) fn expect_empty(&self) -> Result<(), AduParseError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AduParseError::TrailingBytes(self.remaining()))
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, AduParseError> {
        match self.src.split_first() {
            Some((first, rest)) => {
                self.src = rest;
                Ok(*first)
            }
            None => Err(AduParseError::InsufficientBytes),
        }
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, AduParseError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], AduParseError> {
        if self.src.len() < count {
            return Err(AduParseError::InsufficientBytes);
        }
        let (ret, rest) = self.src.split_at(count);
        self.src = rest;
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_u16_does_not_write_partial_values() {
        let mut buffer = [0u8; 3];
        let mut cursor = WriteCursor::new(&mut buffer);
        cursor.write_u16_be(0xCAFE).unwrap();
        assert_eq!(
            cursor.write_u16_be(0xBEEF),
            Err(InternalError::InsufficientWriteSpace(2, 1))
        );
        assert_eq!(cursor.written(), &[0xCA, 0xFE]);
    }

    #[test]
    fn reads_big_endian_values() {
        let mut cursor = ReadCursor::new(&[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(cursor.read_u8(), Ok(0x01));
        assert_eq!(cursor.read_u16_be(), Ok(0x0203));
        assert_eq!(cursor.expect_empty(), Err(AduParseError::TrailingBytes(1)));
        assert_eq!(cursor.read_u16_be(), Err(AduParseError::InsufficientBytes));
        assert_eq!(cursor.read_bytes(1), Ok(&[0x04u8][..]));
        assert!(cursor.is_empty());
    }
}

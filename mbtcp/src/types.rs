use crate::constants::{coil, limits};
use crate::error::{AduParseError, InvalidRange, InvalidRequest};

/// Modbus unit identifier, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

/// Start and count tuple used when making various requests
/// Cannot be constructed with invalid start/count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

/// Collection of values and starting address
///
/// Used when making write multiple coil/register requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteMultiple<T> {
    /// starting address
    pub(crate) range: AddressRange,
    /// vector of values
    pub(crate) values: Vec<T>,
}

impl<T> WriteMultiple<T> {
    /// Create new collection of values
    pub fn from(start: u16, values: Vec<T>) -> Result<Self, InvalidRequest> {
        let count = match u16::try_from(values.len()) {
            Ok(x) => x,
            Err(_) => return Err(InvalidRequest::CountTooBigForU16(values.len())),
        };
        let range = AddressRange::try_from(start, count)?;
        Ok(Self { range, values })
    }

    /// Range of addresses written
    pub fn range(&self) -> AddressRange {
        self.range
    }

    /// Values written, in address order
    pub fn values(&self) -> &[T] {
        self.values.as_slice()
    }
}

impl AddressRange {
    /// Create a new address range
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRange> {
        if count == 0 {
            return Err(InvalidRange::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);

        if start > max_start {
            return Err(InvalidRange::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    /// Converts to std::ops::Range
    pub fn to_std_range(self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        let end = start + (self.count as usize);
        start..end
    }

    /// Iterate over the addresses in the range
    pub fn iter(self) -> AddressIterator {
        AddressIterator::new(self.start, self.count)
    }

    pub(crate) fn limited(self, max: u16) -> Result<Self, InvalidRequest> {
        if self.count > max {
            return Err(InvalidRequest::CountTooBigForType(self.count, max));
        }
        Ok(self)
    }

    pub(crate) fn of_read_bits(self) -> Result<Self, InvalidRequest> {
        self.limited(limits::MAX_READ_COILS_COUNT)
    }

    pub(crate) fn of_read_registers(self) -> Result<Self, InvalidRequest> {
        self.limited(limits::MAX_READ_REGISTERS_COUNT)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

/// Iterator over the addresses of an [`AddressRange`]
pub struct AddressIterator {
    current: u16,
    remain: u16,
}

impl AddressIterator {
    fn new(current: u16, remain: u16) -> Self {
        Self { current, remain }
    }
}

impl Iterator for AddressIterator {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        let remain = self.remain.checked_sub(1)?;
        let ret = self.current;
        self.remain = remain;
        // a validated range never wraps, the final increment is skipped at u16::MAX
        self.current = self.current.saturating_add(1);
        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remain = self.remain as usize;
        (remain, Some(remain))
    }
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl std::fmt::Display for Indexed<bool> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {}", self.index, self.value as i32)
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {:#06X}", self.index, self.value)
    }
}

impl<T> std::fmt::Display for WriteMultiple<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.range.fmt(f)
    }
}

impl UnitId {
    /// Create a new UnitId
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

/// Create the default UnitId of `0xFF`
impl Default for UnitId {
    fn default() -> Self {
        Self { value: 0xFF }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, AduParseError> {
    match value {
        coil::ON => Ok(true),
        coil::OFF => Ok(false),
        _ => Err(AduParseError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        coil::ON
    } else {
        coil::OFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_start_max_count_of_one_is_allowed() {
        AddressRange::try_from(u16::MAX, 1).unwrap();
    }

    #[test]
    fn address_maximum_range_is_ok() {
        AddressRange::try_from(0, 0xFFFF).unwrap();
    }

    #[test]
    fn address_count_zero_fails_validation() {
        assert_eq!(AddressRange::try_from(0, 0), Err(InvalidRange::CountOfZero));
    }

    #[test]
    fn start_max_count_of_two_overflows() {
        assert_eq!(
            AddressRange::try_from(u16::MAX, 2),
            Err(InvalidRange::AddressOverflow(u16::MAX, 2))
        );
    }

    #[test]
    fn iterates_up_to_the_last_address() {
        let values: Vec<u16> = AddressRange::try_from(u16::MAX - 1, 2)
            .unwrap()
            .iter()
            .collect();
        assert_eq!(values, vec![u16::MAX - 1, u16::MAX]);
    }

    #[test]
    fn converts_to_std_range() {
        assert_eq!(AddressRange::try_from(95, 5).unwrap().to_std_range(), 95..100);
    }

    #[test]
    fn read_limits_are_enforced() {
        assert!(AddressRange::try_from(0, 2000).unwrap().of_read_bits().is_ok());
        assert_eq!(
            AddressRange::try_from(0, 2001).unwrap().of_read_bits(),
            Err(InvalidRequest::CountTooBigForType(2001, 2000))
        );
        assert_eq!(
            AddressRange::try_from(0, 126).unwrap().of_read_registers(),
            Err(InvalidRequest::CountTooBigForType(126, 125))
        );
    }

    #[test]
    fn write_multiple_rejects_empty_values() {
        assert_eq!(
            WriteMultiple::<u16>::from(0, Vec::new()),
            Err(InvalidRequest::BadRange(InvalidRange::CountOfZero))
        );
    }

    #[test]
    fn coil_values_are_strict() {
        assert_eq!(coil_from_u16(0xFF00), Ok(true));
        assert_eq!(coil_from_u16(0x0000), Ok(false));
        assert_eq!(
            coil_from_u16(0xABCD),
            Err(AduParseError::UnknownCoilState(0xABCD))
        );
    }
}

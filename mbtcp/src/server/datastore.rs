use std::sync::{Mutex, MutexGuard};

use crate::exception::ExceptionCode;
use crate::types::AddressRange;

/// Selects one of the two single-bit banks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitTable {
    /// Read/write bits
    Coils,
    /// Bits that clients can only read
    DiscreteInputs,
}

/// Selects one of the two 16-bit register banks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterTable {
    /// Read/write registers
    HoldingRegisters,
    /// Registers that clients can only read
    InputRegisters,
}

/// Number of cells in each bank of a [`Datastore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BankCapacities {
    /// number of coils
    pub coils: usize,
    /// number of discrete inputs
    pub discrete_inputs: usize,
    /// number of holding registers
    pub holding_registers: usize,
    /// number of input registers
    pub input_registers: usize,
}

impl BankCapacities {
    /// Same capacity for every bank
    pub fn uniform(capacity: usize) -> Self {
        Self {
            coils: capacity,
            discrete_inputs: capacity,
            holding_registers: capacity,
            input_registers: capacity,
        }
    }
}

struct Bank<T> {
    name: &'static str,
    capacity: usize,
    cells: Mutex<Vec<T>>,
}

impl<T> Bank<T>
where
    T: Copy + Default,
{
    fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            cells: Mutex::new(vec![T::default(); capacity]),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<T>>, ExceptionCode> {
        self.cells.lock().map_err(|_| {
            tracing::error!("{} lock poisoned", self.name);
            ExceptionCode::ServerDeviceFailure
        })
    }

    fn read(&self, range: AddressRange) -> Result<Vec<T>, ExceptionCode> {
        let cells = self.lock()?;
        match cells.get(range.to_std_range()) {
            Some(values) => Ok(values.to_vec()),
            None => Err(ExceptionCode::IllegalDataAddress),
        }
    }

    fn write(&self, start: u16, values: &[T]) -> Result<(), ExceptionCode> {
        let start = start as usize;
        let end = start + values.len();
        let mut cells = self.lock()?;
        match cells.get_mut(start..end) {
            Some(dest) => {
                dest.copy_from_slice(values);
                Ok(())
            }
            None => Err(ExceptionCode::IllegalDataAddress),
        }
    }

    fn update<F>(&self, func: F) -> Result<(), ExceptionCode>
    where
        F: FnOnce(&mut [T]),
    {
        let mut cells = self.lock()?;
        func(cells.as_mut_slice());
        Ok(())
    }
}

/// In-memory model of the four Modbus banks
///
/// Each bank is guarded by its own lock, so a bulk read never observes a
/// partially applied bulk write to the same bank. The datastore is shared
/// between connections by wrapping it in an `Arc`.
pub struct Datastore {
    coils: Bank<bool>,
    discrete_inputs: Bank<bool>,
    holding_registers: Bank<u16>,
    input_registers: Bank<u16>,
}

impl Datastore {
    /// Create a datastore where every bank holds `capacity` zeroed cells
    pub fn new(capacity: usize) -> Self {
        Self::with_capacities(BankCapacities::uniform(capacity))
    }

    /// Create a datastore with a separate capacity for each bank
    pub fn with_capacities(capacities: BankCapacities) -> Self {
        Self {
            coils: Bank::new("coils", capacities.coils),
            discrete_inputs: Bank::new("discrete inputs", capacities.discrete_inputs),
            holding_registers: Bank::new("holding registers", capacities.holding_registers),
            input_registers: Bank::new("input registers", capacities.input_registers),
        }
    }

    fn bits(&self, table: BitTable) -> &Bank<bool> {
        match table {
            BitTable::Coils => &self.coils,
            BitTable::DiscreteInputs => &self.discrete_inputs,
        }
    }

    fn registers(&self, table: RegisterTable) -> &Bank<u16> {
        match table {
            RegisterTable::HoldingRegisters => &self.holding_registers,
            RegisterTable::InputRegisters => &self.input_registers,
        }
    }

    /// Number of cells in a bit bank
    pub fn bit_capacity(&self, table: BitTable) -> usize {
        self.bits(table).capacity
    }

    /// Number of cells in a register bank
    pub fn register_capacity(&self, table: RegisterTable) -> usize {
        self.registers(table).capacity
    }

    /// Read a contiguous range of bits
    pub fn read_bits(&self, table: BitTable, range: AddressRange) -> Result<Vec<bool>, ExceptionCode> {
        self.bits(table).read(range)
    }

    /// Read a contiguous range of registers
    pub fn read_registers(
        &self,
        table: RegisterTable,
        range: AddressRange,
    ) -> Result<Vec<u16>, ExceptionCode> {
        self.registers(table).read(range)
    }

    /// Replace the bits starting at `start`, all or nothing
    pub fn write_bits(&self, table: BitTable, start: u16, values: &[bool]) -> Result<(), ExceptionCode> {
        self.bits(table).write(start, values)
    }

    /// Replace the registers starting at `start`, all or nothing
    pub fn write_registers(
        &self,
        table: RegisterTable,
        start: u16,
        values: &[u16],
    ) -> Result<(), ExceptionCode> {
        self.registers(table).write(start, values)
    }

    /// Modify a whole bit bank under its lock
    pub fn update_bits<F>(&self, table: BitTable, func: F) -> Result<(), ExceptionCode>
    where
        F: FnOnce(&mut [bool]),
    {
        self.bits(table).update(func)
    }

    /// Modify a whole register bank under its lock
    pub fn update_registers<F>(&self, table: RegisterTable, func: F) -> Result<(), ExceptionCode>
    where
        F: FnOnce(&mut [u16]),
    {
        self.registers(table).update(func)
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new(crate::constants::defaults::BANK_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn range(start: u16, count: u16) -> AddressRange {
        AddressRange::try_from(start, count).unwrap()
    }

    #[test]
    fn banks_start_zeroed() {
        let store = Datastore::new(10);
        assert_eq!(
            store.read_bits(BitTable::Coils, range(0, 10)),
            Ok(vec![false; 10])
        );
        assert_eq!(
            store.read_registers(RegisterTable::InputRegisters, range(0, 10)),
            Ok(vec![0; 10])
        );
    }

    #[test]
    fn reads_at_the_end_of_a_bank_are_bounds_checked() {
        let store = Datastore::new(100);
        assert!(store
            .read_registers(RegisterTable::HoldingRegisters, range(95, 5))
            .is_ok());
        assert_eq!(
            store.read_registers(RegisterTable::HoldingRegisters, range(95, 10)),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            store.read_bits(BitTable::DiscreteInputs, range(100, 1)),
            Err(ExceptionCode::IllegalDataAddress)
        );
    }

    #[test]
    fn out_of_bounds_write_changes_nothing() {
        let store = Datastore::new(10);
        assert_eq!(
            store.write_registers(RegisterTable::HoldingRegisters, 8, &[1, 2, 3]),
            Err(ExceptionCode::IllegalDataAddress)
        );
        assert_eq!(
            store.read_registers(RegisterTable::HoldingRegisters, range(0, 10)),
            Ok(vec![0; 10])
        );
    }

    #[test]
    fn write_then_read_returns_written_values() {
        let store = Datastore::new(100);
        store
            .write_registers(RegisterTable::HoldingRegisters, 10, &[100, 200, 300, 400, 500])
            .unwrap();
        store.write_bits(BitTable::Coils, 0, &[true]).unwrap();
        assert_eq!(
            store.read_registers(RegisterTable::HoldingRegisters, range(10, 5)),
            Ok(vec![100, 200, 300, 400, 500])
        );
        assert_eq!(store.read_bits(BitTable::Coils, range(0, 2)), Ok(vec![true, false]));
    }

    #[test]
    fn banks_are_independent() {
        let store = Datastore::with_capacities(BankCapacities {
            coils: 1,
            discrete_inputs: 2,
            holding_registers: 3,
            input_registers: 4,
        });
        store
            .update_registers(RegisterTable::InputRegisters, |cells| cells.fill(7))
            .unwrap();
        assert_eq!(store.register_capacity(RegisterTable::InputRegisters), 4);
        assert_eq!(store.bit_capacity(BitTable::Coils), 1);
        assert_eq!(
            store.read_registers(RegisterTable::HoldingRegisters, range(0, 3)),
            Ok(vec![0; 3])
        );
        assert_eq!(
            store.read_registers(RegisterTable::InputRegisters, range(0, 4)),
            Ok(vec![7; 4])
        );
    }

    #[test]
    fn concurrent_bulk_writes_are_never_observed_partially() {
        let store = Arc::new(Datastore::new(100));

        let writers: Vec<_> = (1..=4u16)
            .map(|value| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        store
                            .write_registers(RegisterTable::HoldingRegisters, 0, &[value; 50])
                            .unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let values = store
                .read_registers(RegisterTable::HoldingRegisters, range(0, 50))
                .unwrap();
            assert!(values.iter().all(|x| *x == values[0]), "torn read: {values:?}");
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }
}

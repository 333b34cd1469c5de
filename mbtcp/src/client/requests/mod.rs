mod read_bits;
mod read_registers;
mod write_multiple;
mod write_single;

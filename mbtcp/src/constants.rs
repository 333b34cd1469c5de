/// Values of a coil in a write single coil request
pub mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub const OFF: u16 = 0x0000;
}

/// Per-request count limits
pub mod limits {
    /// Maximum count allowed in a read coils/discrete inputs request
    pub const MAX_READ_COILS_COUNT: u16 = 0x07D0;
    /// Maximum count allowed in a read holding/input registers request
    pub const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
    /// Maximum count allowed in a `write multiple coils` request
    pub const MAX_WRITE_COILS_COUNT: u16 = 0x07B0;
    /// Maximum count allowed in a `write multiple registers` request
    pub const MAX_WRITE_REGISTERS_COUNT: u16 = 0x007B;
}

/// Raw exception codes
pub mod exceptions {
    /// Illegal function
    pub const ILLEGAL_FUNCTION: u8 = 0x01;
    /// Illegal data address
    pub const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    /// Illegal data value
    pub const ILLEGAL_DATA_VALUE: u8 = 0x03;
    /// Server device failure
    pub const SERVER_DEVICE_FAILURE: u8 = 0x04;
}

/// Defaults shared by the client, server, and binaries
pub mod defaults {
    use std::time::Duration;

    /// TCP port used by the bundled client and server
    pub const PORT: u16 = 5020;
    /// Number of cells in each bank of a default datastore
    pub const BANK_CAPACITY: usize = 100;
    /// Time a client waits for a response before failing the request
    pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);
}

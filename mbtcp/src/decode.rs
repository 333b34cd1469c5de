/// Controls the decoding of transmitted and received data at the application, frame, and physical layer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeLevel {
    /// Controls decoding of the PDU (function code and data)
    pub app: AppDecodeLevel,
    /// Controls decoding of the MBAP header
    pub frame: FrameDecodeLevel,
    /// Controls the logging of physical layer read/write
    pub physical: PhysDecodeLevel,
}

/// Controls how transmitted and received PDUs are decoded at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum AppDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the function code only
    FunctionCode,
    /// Decode the function code and the general description of the data
    DataHeaders,
    /// Decode the function code, the general description of the data and the actual data values
    DataValues,
}

/// Controls how the MBAP header and payload of frames are decoded at the INFO log level
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameDecodeLevel {
    /// Decode nothing
    #[default]
    Nothing,
    /// Decode the header
    Header,
    /// Decode the header and the raw payload as hexadecimal
    Payload,
}

/// Controls how data transmitted over TCP is logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log only the length of data that is sent and received
    Length,
    /// Log the length and the actual data that is sent and received
    Data,
}

impl DecodeLevel {
    /// construct a `DecodeLevel` with nothing enabled
    pub fn nothing() -> Self {
        Self::default()
    }

    /// construct a `DecodeLevel` from its fields
    pub fn new(app: AppDecodeLevel, frame: FrameDecodeLevel, physical: PhysDecodeLevel) -> Self {
        DecodeLevel {
            app,
            frame,
            physical,
        }
    }

    /// Change the application decode level
    pub fn application(mut self, level: AppDecodeLevel) -> Self {
        self.app = level;
        self
    }

    /// Change the frame decode level
    pub fn frame(mut self, level: FrameDecodeLevel) -> Self {
        self.frame = level;
        self
    }

    /// Change the physical layer decode level
    pub fn physical(mut self, level: PhysDecodeLevel) -> Self {
        self.physical = level;
        self
    }
}

impl From<AppDecodeLevel> for DecodeLevel {
    fn from(app: AppDecodeLevel) -> Self {
        Self {
            app,
            frame: FrameDecodeLevel::Nothing,
            physical: PhysDecodeLevel::Nothing,
        }
    }
}

impl AppDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        *self >= AppDecodeLevel::FunctionCode
    }

    pub(crate) fn data_headers(&self) -> bool {
        *self >= AppDecodeLevel::DataHeaders
    }

    pub(crate) fn data_values(&self) -> bool {
        *self == AppDecodeLevel::DataValues
    }
}

impl FrameDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        *self >= FrameDecodeLevel::Header
    }

    pub(crate) fn payload_enabled(&self) -> bool {
        *self == FrameDecodeLevel::Payload
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(&self) -> bool {
        *self >= PhysDecodeLevel::Length
    }

    pub(crate) fn data_enabled(&self) -> bool {
        *self == PhysDecodeLevel::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_cumulative() {
        assert!(!AppDecodeLevel::Nothing.enabled());
        assert!(AppDecodeLevel::FunctionCode.enabled());
        assert!(!AppDecodeLevel::FunctionCode.data_headers());
        assert!(AppDecodeLevel::DataValues.data_headers());
        assert!(AppDecodeLevel::DataValues.data_values());
        assert!(FrameDecodeLevel::Payload.enabled());
        assert!(!FrameDecodeLevel::Header.payload_enabled());
        assert!(PhysDecodeLevel::Length.enabled());
        assert!(!PhysDecodeLevel::Length.data_enabled());
    }
}

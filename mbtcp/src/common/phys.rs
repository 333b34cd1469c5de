use std::fmt::Write;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::decode::PhysDecodeLevel;

pub(crate) async fn read<T: AsyncRead + Unpin>(
    io: &mut T,
    buffer: &mut [u8],
    level: PhysDecodeLevel,
) -> Result<usize, std::io::Error> {
    let length = io.read(buffer).await?;

    if level.enabled() {
        if let Some(x) = buffer.get(0..length) {
            tracing::info!("PHYS RX - {}", PhysDisplay::new(level, x))
        }
    }

    Ok(length)
}

pub(crate) async fn write<T: AsyncWrite + Unpin>(
    io: &mut T,
    data: &[u8],
    level: PhysDecodeLevel,
) -> Result<(), std::io::Error> {
    if level.enabled() {
        tracing::info!("PHYS TX - {}", PhysDisplay::new(level, data));
    }

    io.write_all(data).await?;
    io.flush().await
}

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        PhysDisplay { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

const BYTES_PER_DECODE_LINE: usize = 18;

pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_DECODE_LINE) {
        writeln!(f)?;
        let mut first = true;
        for byte in chunk {
            if !first {
                f.write_char(' ')?;
            }
            first = false;
            write!(f, "{byte:02X?}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_length_only_or_hex_data() {
        let data = [0x00, 0x2A, 0xFF];
        assert_eq!(
            PhysDisplay::new(PhysDecodeLevel::Length, &data).to_string(),
            "3 bytes"
        );
        assert_eq!(
            PhysDisplay::new(PhysDecodeLevel::Data, &data).to_string(),
            "3 bytes\n00 2A FF"
        );
    }
}

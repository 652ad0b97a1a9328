//! Little-endian byte codec for ST-Link wire fields.
//!
//! All multi-byte fields on the wire are little-endian regardless of host
//! endianness. We rely on `u16::to_le_bytes`/`from_le_bytes` rather than a
//! runtime endianness probe.

/// Write a little-endian `u16` into `buf` at `offset`.
pub fn write_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Write a little-endian `u32` into `buf` at `offset`.
pub fn write_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read a little-endian `u16` from `buf` at `offset`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

/// Read a little-endian `u32` from `buf` at `offset`.
pub fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trips_at_any_offset() {
        for offset in 0..4 {
            let mut buf = [0u8; 8];
            write_u32_le(&mut buf, offset, 0xDEADBEEF);
            assert_eq!(read_u32_le(&buf, offset), 0xDEADBEEF);
        }
    }

    #[test]
    fn u16_round_trips_at_any_offset() {
        for offset in 0..6 {
            let mut buf = [0u8; 8];
            write_u16_le(&mut buf, offset, 0xCAFE);
            assert_eq!(read_u16_le(&buf, offset), 0xCAFE);
        }
    }

    #[test]
    fn u32_is_little_endian_on_the_wire() {
        let mut buf = [0u8; 4];
        write_u32_le(&mut buf, 0, 0x12345678);
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn u16_is_little_endian_on_the_wire() {
        let mut buf = [0u8; 2];
        write_u16_le(&mut buf, 0, 0xABCD);
        assert_eq!(buf, [0xCD, 0xAB]);
    }
}

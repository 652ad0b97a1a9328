//! Target memory engine: chunking, alignment and range policy layered over
//! the raw `READ_MEM_32BIT`/`WRITE_MEM_32BIT`/`WRITE_MEM_8BIT` commands.

use stlink_link::{Session, Transport};

use crate::error::{FlashError, Result};

/// Per-CDB ceiling for `READ_MEM_32BIT`: the adapter will not answer a
/// single 32-bit read transaction larger than this.
pub const READ32_MAX_LEN: usize = 6144;

/// Chunk size used for `WRITE_MEM_32BIT`; the adapter enforces no hard
/// ceiling here, but the loader image and general writes still move through
/// in page-sized pieces for the same reason the original tool did.
pub const WRITE32_CHUNK_LEN: usize = 1024;

/// Per-CDB ceiling for `WRITE_MEM_8BIT`: the adapter will not answer a
/// single 8-bit write transaction larger than this.
pub const WRITE8_MAX_LEN: usize = 64;

/// An addressable target region (flash, SRAM, or system memory), used to
/// bound `read32`/`write32`/`write8` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u32,
    pub size: u32,
}

impl Region {
    pub fn flash(map: stlink_link::MemoryMap) -> Self {
        Region {
            base: map.flash_base,
            size: map.flash_size,
        }
    }

    pub fn sram(map: stlink_link::MemoryMap) -> Self {
        Region {
            base: map.sram_base,
            size: map.sram_size,
        }
    }

    pub fn system(map: stlink_link::MemoryMap) -> Self {
        Region {
            base: map.system_base,
            size: map.system_size,
        }
    }

    /// An unbounded region, for register/peripheral access that is not
    /// confined to flash/SRAM/system (e.g. the FPEC or GPIOC blocks).
    pub fn unbounded() -> Self {
        Region {
            base: 0,
            size: u32::MAX,
        }
    }

    fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }
}

fn check_aligned(addr: u32, align: u32) -> Result<()> {
    if addr % align != 0 {
        return Err(FlashError::Misaligned { addr, align });
    }
    Ok(())
}

fn check_range(region: Region, addr: u32, len: usize) -> Result<()> {
    let end = (addr as u64)
        .checked_add(len as u64)
        .ok_or(FlashError::RangeOverflow { addr, len })?;
    if (addr as u64) < region.base as u64 || end > region.end() {
        return Err(FlashError::AddressOutOfRange {
            addr,
            len,
            region_base: region.base,
            region_end: region.end().min(u32::MAX as u64) as u32,
        });
    }
    Ok(())
}

/// Round `n` up to the next multiple of 4, without exceeding `ceiling` or
/// `remaining`. This is the fixed form of the original tool's last-chunk
/// clamp, which used `off + read_size` (the running offset) instead of the
/// remaining byte count and so could request more than was left.
fn chunk_len(remaining: usize, ceiling: usize) -> usize {
    let chunk = remaining.min(ceiling);
    let rounded = (chunk + 3) & !3;
    rounded.min(remaining)
}

/// Read `len` bytes (must be a multiple of 4) from `addr` (must be 4-byte
/// aligned) inside `region` via a single `READ_MEM_32BIT` transaction.
/// Rejects `len > `[`READ32_MAX_LEN`] outright; splitting a larger read into
/// several transactions is the caller's responsibility.
pub fn read32<T: Transport>(
    session: &mut Session<T>,
    region: Region,
    addr: u32,
    len: usize,
) -> Result<Vec<u8>> {
    if len > READ32_MAX_LEN {
        return Err(FlashError::LengthTooLarge {
            len,
            max: READ32_MAX_LEN,
        });
    }
    check_aligned(addr, 4)?;
    check_aligned(len as u32, 4)?;
    check_range(region, addr, len)?;

    session.read_mem_32bit(addr, len as u16)
}

/// Write `data` (length must be a multiple of 4) to `addr` (must be 4-byte
/// aligned) inside `region`, chunked through `WRITE_MEM_32BIT`.
pub fn write32<T: Transport>(
    session: &mut Session<T>,
    region: Region,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    check_aligned(addr, 4)?;
    check_aligned(data.len() as u32, 4)?;
    check_range(region, addr, data.len())?;

    let mut off = 0usize;
    while off < data.len() {
        let chunk = chunk_len(data.len() - off, WRITE32_CHUNK_LEN);
        session.write_mem_32bit(addr + off as u32, &data[off..off + chunk])?;
        off += chunk;
    }
    Ok(())
}

/// Write `data` to `addr` inside `region` through `WRITE_MEM_8BIT`, chunked
/// at [`WRITE8_MAX_LEN`] bytes per transaction (the adapter's hard ceiling
/// for this command). No alignment is required; used for the loader image,
/// the loader's input buffer, and half-word flash writes.
pub fn write8<T: Transport>(
    session: &mut Session<T>,
    region: Region,
    addr: u32,
    data: &[u8],
) -> Result<()> {
    check_range(region, addr, data.len())?;

    let mut off = 0usize;
    while off < data.len() {
        let chunk = (data.len() - off).min(WRITE8_MAX_LEN);
        session.write_mem_8bit(addr + off as u32, &data[off..off + chunk])?;
        off += chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stlink_link::Session;

    struct MockTransport {
        calls: Vec<(u32, usize)>,
    }

    impl Transport for MockTransport {
        fn execute_none(
            &mut self,
            _cdb: &[u8; stlink_proto::opcode::CDB_LEN],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }

        fn execute_read(
            &mut self,
            cdb: &[u8; stlink_proto::opcode::CDB_LEN],
            buf: &mut [u8],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            let addr = stlink_proto::codec::read_u32_le(cdb, 2);
            self.calls.push((addr, buf.len()));
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }

        fn execute_write(
            &mut self,
            cdb: &[u8; stlink_proto::opcode::CDB_LEN],
            buf: &[u8],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            let addr = stlink_proto::codec::read_u32_le(cdb, 2);
            self.calls.push((addr, buf.len()));
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }
    }

    fn flash_region() -> Region {
        Region::flash(stlink_link::MemoryMap::default())
    }

    #[test]
    fn rejects_unaligned_address() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let err = write32(&mut session, flash_region(), 0x0800_0001, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, FlashError::Misaligned { .. }));
    }

    #[test]
    fn rejects_unaligned_length() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let err = write32(&mut session, flash_region(), 0x0800_0000, &[0u8; 3]).unwrap_err();
        assert!(matches!(err, FlashError::Misaligned { .. }));
    }

    #[test]
    fn rejects_write_past_region_end() {
        let map = stlink_link::MemoryMap::default();
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let addr = map.flash_base + map.flash_size - 4;
        let err = write32(&mut session, flash_region(), addr, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, FlashError::AddressOutOfRange { .. }));
    }

    #[test]
    fn rejects_address_below_region_base() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let err = write32(&mut session, flash_region(), 0x0000_0000, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, FlashError::AddressOutOfRange { .. }));
    }

    #[test]
    fn reads_up_to_the_6144_byte_ceiling_in_one_transaction() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let map = stlink_link::MemoryMap::default();
        read32(&mut session, flash_region(), map.flash_base, 6144).unwrap();
        let calls = &session.transport_mut().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (map.flash_base, 6144));
    }

    #[test]
    fn rejects_a_read_past_the_6144_byte_ceiling_without_touching_the_transport() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let map = stlink_link::MemoryMap::default();
        let err = read32(&mut session, flash_region(), map.flash_base, 6144 + 4).unwrap_err();
        assert!(matches!(
            err,
            FlashError::LengthTooLarge { len: 6148, max: 6144 }
        ));
        assert!(session.transport_mut().calls.is_empty());
    }

    #[test]
    fn write8_never_exceeds_64_bytes_per_transaction() {
        let mut session = Session::new(MockTransport { calls: vec![] }, 0);
        let map = stlink_link::MemoryMap::default();
        let data = vec![0u8; 130];
        write8(&mut session, Region::sram(map), map.sram_base, &data).unwrap();
        let calls = &session.transport_mut().calls;
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|&(_, n)| n <= 64));
        assert_eq!(calls[0], (map.sram_base, 64));
        assert_eq!(calls[1], (map.sram_base + 64, 64));
        assert_eq!(calls[2], (map.sram_base + 128, 2));
    }

    #[test]
    fn chunk_len_never_exceeds_remaining_or_ceiling() {
        assert_eq!(chunk_len(4, 64), 4);
        assert_eq!(chunk_len(64, 64), 64);
        assert_eq!(chunk_len(65, 64), 64);
        assert_eq!(chunk_len(2, 64), 2);
    }
}

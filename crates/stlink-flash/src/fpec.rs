//! FPEC flash engine: unlock/lock, page/mass erase, the SRAM-resident
//! half-word programming loader, and the block-write flow that drives it.

use std::time::{Duration, Instant};

use stlink_link::{Session, Transport};
use stlink_proto::model::fpec;

use crate::error::{FlashError, Result};
use crate::mem::{self, Region};

/// Interval between `wait_busy`/`wait_halted` poll iterations.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Default deadline for a single flash operation (erase, unlock, loader
/// run) to complete.
pub const DEFAULT_FLASH_DEADLINE: Duration = Duration::from_secs(5);

/// Number of half-words programmed per loader invocation
/// (`WRITE_BLOCK_SIZE` in the original tool).
pub const WRITE_BLOCK_SIZE: usize = 0x40;

/// SRAM-resident Thumb loader that copies half-words from a source buffer
/// to a target address, polling `FLASH_SR` between each store. Expects, on
/// entry: r0 = source address, r1 = target address, r2 = half-word count,
/// r3 = FPEC base offset (0 selects the on-chip FPEC at its default
/// address). Exits via `bkpt` with r2 holding the count of half-words
/// *not* written (0 on success).
pub const LOADER_CODE: [u8; 40] = [
    0x08, 0x4c, // ldr  r4, [pc, #STM32_FLASH_BASE]
    0x1c, 0x44, // add  r4, r3
    0x01, 0x23, // movs r3, #0x01          write_half_word:
    0x23, 0x61, // str  r3, [r4, #0x10]    FLASH_CR_OFFSET
    0x30, 0xf8, 0x02, 0x3b, // ldrh r3, [r0], #0x02
    0x21, 0xf8, 0x02, 0x3b, // strh r3, [r1], #0x02
    0xe3, 0x68, // ldr  r3, [r4, #0x0c]    busy: FLASH_SR_OFFSET
    0x13, 0xf0, 0x01, 0x0f, // tst  r3, #0x01
    0xfb, 0xd0, // beq  busy
    0x13, 0xf0, 0x14, 0x0f, // tst  r3, #0x14
    0x01, 0xd1, // bne  exit
    0x01, 0x3a, // subs r2, r2, #0x01
    0xf0, 0xd1, // bne  write_half_word
    0x00, 0xbe, // bkpt #0x00              exit:
    0x00, 0x20, 0x02, 0x40, // .word 0x40022000    STM32_FLASH_BASE
];

fn read_fpec_reg<T: Transport>(session: &mut Session<T>, addr: u32) -> Result<u32> {
    let bytes = mem::read32(session, Region::unbounded(), addr, 4)?;
    Ok(stlink_proto::codec::read_u32_le(&bytes, 0))
}

fn write_fpec_reg<T: Transport>(session: &mut Session<T>, addr: u32, value: u32) -> Result<()> {
    mem::write32(session, Region::unbounded(), addr, &value.to_le_bytes())
}

pub fn is_busy<T: Transport>(session: &mut Session<T>) -> Result<bool> {
    Ok(read_fpec_reg(session, fpec::SR)? & fpec::SR_BSY != 0)
}

pub fn is_eop<T: Transport>(session: &mut Session<T>) -> Result<bool> {
    Ok(read_fpec_reg(session, fpec::SR)? & fpec::SR_EOP != 0)
}

pub fn is_locked<T: Transport>(session: &mut Session<T>) -> Result<bool> {
    Ok(read_fpec_reg(session, fpec::CR)? & fpec::CR_LOCK != 0)
}

/// Poll [`is_busy`] until it clears or `deadline` elapses.
pub fn wait_busy<T: Transport>(session: &mut Session<T>, addr: u32, deadline: Duration) -> Result<()> {
    let start = Instant::now();
    while is_busy(session)? {
        if start.elapsed() >= deadline {
            return Err(FlashError::Timeout {
                addr,
                timeout_ms: deadline.as_millis() as u64,
            });
        }
        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
    Ok(())
}

/// Write the two unlock keys to `FLASH_KEYR` if the controller is
/// currently locked; a no-op otherwise.
pub fn unlock_if_locked<T: Transport>(session: &mut Session<T>) -> Result<()> {
    if !is_locked(session)? {
        return Ok(());
    }
    log::debug!("stlink-flash: FPEC locked, writing unlock key sequence");
    write_fpec_reg(session, fpec::KEYR, fpec::KEY1)?;
    write_fpec_reg(session, fpec::KEYR, fpec::KEY2)?;
    if is_locked(session)? {
        log::warn!("stlink-flash: FPEC still locked after unlock key sequence");
        return Err(FlashError::FlashLockStuck);
    }
    Ok(())
}

/// Set `CR = LOCK`. Called on every exit path of every flash operation in
/// this engine, matching the original's re-lock-on-exit discipline.
pub fn lock<T: Transport>(session: &mut Session<T>) -> Result<()> {
    write_fpec_reg(session, fpec::CR, fpec::CR_LOCK)
}

/// Erase the page containing `page_addr`. `page_addr` may be any address
/// inside the page.
pub fn erase_page<T: Transport>(
    session: &mut Session<T>,
    page_addr: u32,
    deadline: Duration,
) -> Result<()> {
    log::debug!("stlink-flash: erasing page at {page_addr:#010x}");
    let result = (|| -> Result<()> {
        wait_busy(session, page_addr, deadline)?;
        unlock_if_locked(session)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_PER)?;
        write_fpec_reg(session, fpec::AR, page_addr)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_PER | fpec::CR_STRT)?;
        wait_busy(session, page_addr, deadline)
    })();
    lock(session)?;
    result
}

/// Erase the entire flash array.
pub fn mass_erase<T: Transport>(session: &mut Session<T>, deadline: Duration) -> Result<()> {
    log::debug!("stlink-flash: mass erasing the flash array");
    let result = (|| -> Result<()> {
        wait_busy(session, fpec::BASE, deadline)?;
        unlock_if_locked(session)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_MER)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_MER | fpec::CR_STRT)?;
        wait_busy(session, fpec::BASE, deadline)
    })();
    lock(session)?;
    result
}

/// Program a single half-word at `addr` (which must be 2-byte aligned)
/// without the SRAM loader: unlock, set `CR = PG`, write the two bytes,
/// wait for completion, re-lock, then read back and confirm. Grounded in
/// the original's `write_flash_mem16`, used by the `write-demo` CLI
/// command.
pub fn write_halfword<T: Transport>(
    session: &mut Session<T>,
    region: Region,
    addr: u32,
    value: u16,
    deadline: Duration,
) -> Result<()> {
    if addr % 2 != 0 {
        return Err(FlashError::Misaligned { addr, align: 2 });
    }

    let result = (|| -> Result<()> {
        unlock_if_locked(session)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_PG)?;
        mem::write8(session, region, addr, &value.to_le_bytes())?;
        wait_busy(session, addr, deadline)
    })();
    lock(session)?;
    result?;

    let readback = mem::read32(session, region, addr & !0x3, 4)?;
    let half = stlink_proto::codec::read_u16_le(&readback, (addr & 0x3) as usize);
    if half != value {
        return Err(FlashError::VerifyMismatch {
            addr,
            expected: value as u8,
            actual: half as u8,
        });
    }
    Ok(())
}

/// Copy the 40-byte loader into SRAM at `sram_base` and return its
/// (address, size) for use by [`run_loader`].
pub fn deploy_loader<T: Transport>(
    session: &mut Session<T>,
    sram_base: u32,
) -> Result<(u32, u32)> {
    mem::write32(
        session,
        Region::unbounded(),
        sram_base,
        &LOADER_CODE,
    )?;
    Ok((sram_base, LOADER_CODE.len() as u32))
}

/// Write `buf` (at most [`WRITE_BLOCK_SIZE`] bytes) to the loader's input
/// buffer, right after the deployed loader code.
pub fn stage_block<T: Transport>(
    session: &mut Session<T>,
    buf_addr: u32,
    buf: &[u8],
) -> Result<()> {
    mem::write8(session, Region::unbounded(), buf_addr, buf)
}

/// Set up the loader's registers, unlock and arm `CR = PG`, run it, wait
/// for the core to halt (the loader's `bkpt`), re-lock, then check that r2
/// (the remaining-half-word count) is zero.
pub fn run_loader<T: Transport>(
    session: &mut Session<T>,
    loader_addr: u32,
    buf_addr: u32,
    target: u32,
    half_word_count: u32,
    deadline: Duration,
) -> Result<()> {
    session.write_reg(0, buf_addr)?;
    session.write_reg(1, target)?;
    session.write_reg(2, half_word_count)?;
    session.write_reg(3, 0)?;
    session.write_reg(15, loader_addr)?;

    let result = (|| -> Result<()> {
        unlock_if_locked(session)?;
        write_fpec_reg(session, fpec::CR, fpec::CR_PG)?;
        session.run_core()?;
        session.wait_halted(deadline)?;
        Ok(())
    })();
    lock(session)?;
    result?;

    let remaining = session.read_reg(2)?;
    if remaining != 0 {
        log::warn!(
            "stlink-flash: loader left {remaining} half-words unwritten at {target:#010x}"
        );
        return Err(FlashError::FlashWriteIncomplete {
            addr: target,
            remaining,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stlink_proto::opcode::CDB_LEN;

    #[derive(Default)]
    struct MockTransport {
        sr_always_busy: bool,
        writes: Vec<(u32, Vec<u8>)>,
        status_sequence: std::collections::VecDeque<u8>,
        reg2_after_run: u32,
    }

    impl Transport for MockTransport {
        fn execute_none(
            &mut self,
            _cdb: &[u8; CDB_LEN],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }

        fn execute_read(
            &mut self,
            cdb: &[u8; CDB_LEN],
            buf: &mut [u8],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            use stlink_proto::opcode::debug;
            match cdb[1] {
                debug::READ_MEM_32BIT => {
                    let addr = stlink_proto::codec::read_u32_le(cdb, 2);
                    if addr == fpec::SR {
                        let sr = if self.sr_always_busy { fpec::SR_BSY } else { 0 };
                        stlink_proto::codec::write_u32_le(buf, 0, sr);
                    } else if addr == fpec::CR {
                        stlink_proto::codec::write_u32_le(buf, 0, 0);
                    }
                }
                debug::GET_STATUS => {
                    buf[0] = self.status_sequence.pop_front().unwrap_or(0x81);
                }
                debug::READ_REG => {
                    if cdb[2] == 2 {
                        stlink_proto::codec::write_u32_le(buf, 0, self.reg2_after_run);
                    }
                }
                _ => {}
            }
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }

        fn execute_write(
            &mut self,
            cdb: &[u8; CDB_LEN],
            buf: &[u8],
            _timeout_ms: u32,
        ) -> stlink_scsi::Result<stlink_scsi::TransferOutcome> {
            let addr = stlink_proto::codec::read_u32_le(cdb, 2);
            self.writes.push((addr, buf.to_vec()));
            Ok(stlink_scsi::TransferOutcome { status: 0 })
        }
    }

    #[test]
    fn loader_is_exactly_40_bytes_and_ends_with_a_breakpoint() {
        assert_eq!(LOADER_CODE.len(), 40);
        assert_eq!(LOADER_CODE[34], 0x00);
        assert_eq!(LOADER_CODE[35], 0xbe);
    }

    #[test]
    fn erase_page_relocks_even_when_the_controller_never_goes_idle() {
        let mut transport = MockTransport::default();
        // SR.BSY never clears, so the pre-erase wait_busy() inside the
        // closure times out before STRT is ever written.
        transport.sr_always_busy = true;
        let mut session = Session::new(transport, 0);

        let result = erase_page(&mut session, 0x0800_0000, Duration::from_millis(20));
        assert!(matches!(result, Err(FlashError::Timeout { .. })));
        let writes = &session.transport_mut().writes;
        let locked_at_end = writes
            .iter()
            .rev()
            .find(|(addr, _)| *addr == fpec::CR)
            .map(|(_, data)| stlink_proto::codec::read_u32_le(data, 0));
        assert_eq!(locked_at_end, Some(fpec::CR_LOCK));
    }

    #[test]
    fn run_loader_sets_up_registers_before_running() {
        let mut transport = MockTransport::default();
        transport.status_sequence = std::collections::VecDeque::from(vec![0x81u8]); // halted
        transport.reg2_after_run = 0;
        let mut session = Session::new(transport, 0);
        session.force_debug().unwrap();

        run_loader(&mut session, 0x2000_0000, 0x2000_0028, 0x0800_0000, 32, Duration::from_millis(200))
            .unwrap();
    }

    #[test]
    fn run_loader_reports_incomplete_write() {
        let mut transport = MockTransport::default();
        transport.status_sequence = std::collections::VecDeque::from(vec![0x81u8]);
        transport.reg2_after_run = 3;
        let mut session = Session::new(transport, 0);
        session.force_debug().unwrap();

        let err = run_loader(
            &mut session,
            0x2000_0000,
            0x2000_0028,
            0x0800_0000,
            32,
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, FlashError::FlashWriteIncomplete { .. }));
    }

    #[test]
    fn write_halfword_rejects_odd_addresses() {
        let mut session = Session::new(MockTransport::default(), 0);
        let err = write_halfword(
            &mut session,
            Region::unbounded(),
            0x0800_0ba1,
            0xDBEC,
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, FlashError::Misaligned { align: 2, .. }));
    }
}

//! `sram write` — load a file into SRAM via plain `WRITE_MEM_32BIT` (no
//! flash engine involved) and verify it by reading it back.

use std::path::Path;

use stlink_flash::{mem, FlashError, Region};
use stlink_link::Session;
use stlink_scsi::ScsiTransport;

use super::error::{read_file, OpError, Result};
use super::open::{close, open_and_enter_swd};

const BLOCK_SIZE: usize = 1024;

pub fn write(device: &Path, verbosity: u8, timeout_ms: u32, path: &Path, addr: u32) -> Result<()> {
    let data = read_file(path)?;
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let result = write_and_verify(&mut session, &data, addr);
    close(&mut session)?;
    result?;

    println!("loaded {} bytes into SRAM at {:#010x}", data.len(), addr);
    Ok(())
}

fn write_and_verify(session: &mut Session<ScsiTransport>, data: &[u8], addr: u32) -> Result<()> {
    let map = session.memory_map();
    let sram = Region::sram(map);

    if addr % 4 != 0 {
        return Err(OpError::FileMisaligned {
            addr,
            len: data.len(),
        });
    }
    let padded_len = (data.len() + 3) & !3;
    if (addr as u64) < sram.base as u64 || (addr as u64) + padded_len as u64 > sram.base as u64 + sram.size as u64
    {
        return Err(OpError::FileTooLarge {
            addr,
            len: data.len(),
            region: "sram",
            region_size: sram.size,
        });
    }

    let mut padded = data.to_vec();
    padded.resize(padded_len, 0);

    let mut off = 0usize;
    while off < padded.len() {
        let len = (padded.len() - off).min(BLOCK_SIZE);
        mem::write32(session, sram, addr + off as u32, &padded[off..off + len])?;
        off += len;
    }

    let mut off = 0usize;
    while off < padded_len {
        let len = (padded_len - off).min(mem::READ32_MAX_LEN);
        let readback = mem::read32(session, sram, addr + off as u32, len)?;
        for (i, &actual) in readback.iter().enumerate() {
            let abs = off + i;
            if abs >= data.len() {
                break;
            }
            if actual != data[abs] {
                return Err(FlashError::VerifyMismatch {
                    addr: addr + abs as u32,
                    expected: data[abs],
                    actual,
                }
                .into());
            }
        }
        off += len;
    }
    Ok(())
}

//! `flash write` / `flash read` / `flash check` — file-to-flash programming
//! (erase + SRAM-loader block write + verify), flash/SRAM read-to-file, and
//! file-vs-device comparison. Grounded in the original's `flash-transfer.c`
//! dispatch for `flash:v` (write+verify) and the plain read/check paths.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use stlink_flash::fpec::{self, DEFAULT_FLASH_DEADLINE, WRITE_BLOCK_SIZE};
use stlink_flash::{mem, FlashError, Region};
use stlink_link::{Session, Transport};

use super::error::{read_file, write_file, OpError, Result};
use super::open::{close, open_and_enter_swd};

fn progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} {}",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

/// Erase every page the `[addr, addr+len)` span touches, program it
/// through the SRAM loader in [`WRITE_BLOCK_SIZE`]-byte blocks, then
/// (unless `no_verify`) read the region back and compare.
pub fn write(device: &Path, verbosity: u8, timeout_ms: u32, path: &Path, addr: u32, no_verify: bool) -> Result<()> {
    let data = read_file(path)?;
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let result = write_to_session(&mut session, &data, addr);
    close(&mut session)?;
    result?;

    if !no_verify {
        check(device, verbosity, timeout_ms, path, addr)?;
    }
    println!("wrote {} bytes at {:#010x}", data.len(), addr);
    Ok(())
}

fn write_to_session<T: Transport>(session: &mut Session<T>, data: &[u8], addr: u32) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }

    let map = session.memory_map();
    let flash = Region::flash(map);

    if addr % 2 != 0 || data.len() % 2 != 0 {
        return Err(OpError::FileMisaligned {
            addr,
            len: data.len(),
        });
    }
    if (addr as u64) < flash.base as u64
        || (addr as u64) + data.len() as u64 > flash.base as u64 + flash.size as u64
    {
        return Err(OpError::FileTooLarge {
            addr,
            len: data.len(),
            region: "flash",
            region_size: flash.size,
        });
    }

    let page_size = map.flash_page_size;
    let first_page = addr - (addr % page_size);
    let last_page = (addr + data.len() as u32 - 1) - ((addr + data.len() as u32 - 1) % page_size);

    let pages = (first_page..=last_page).step_by(page_size as usize);
    let erase_pb = progress_bar(
        ((last_page - first_page) / page_size + 1) as u64,
        "erasing pages",
    );
    for page_addr in pages {
        fpec::erase_page(session, page_addr, DEFAULT_FLASH_DEADLINE)?;
        erase_pb.inc(1);
    }
    erase_pb.finish_and_clear();

    let (loader_addr, loader_size) = fpec::deploy_loader(session, map.sram_base)?;
    let buf_addr = loader_addr + loader_size;

    let write_pb = progress_bar(data.len() as u64, "programming");
    let mut off = 0usize;
    while off < data.len() {
        let chunk_len = (data.len() - off).min(WRITE_BLOCK_SIZE);
        let chunk = &data[off..off + chunk_len];
        fpec::stage_block(session, buf_addr, chunk)?;
        fpec::run_loader(
            session,
            loader_addr,
            buf_addr,
            addr + off as u32,
            (chunk_len / 2) as u32,
            DEFAULT_FLASH_DEADLINE,
        )?;
        off += chunk_len;
        write_pb.inc(chunk_len as u64);
    }
    write_pb.finish_and_clear();
    Ok(())
}

/// Stream `size` bytes (rounded up to a multiple of 4) starting at `addr`
/// to `path`, 1 KiB at a time.
pub fn read(device: &Path, verbosity: u8, timeout_ms: u32, path: &Path, addr: u32, size: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let result = read_to_vec(&mut session, addr, size);
    close(&mut session)?;
    let data = result?;

    write_file(path, &data[..size as usize])?;
    println!("read {} bytes from {:#010x} into {}", size, addr, path.display());
    Ok(())
}

fn read_to_vec<T: Transport>(session: &mut Session<T>, addr: u32, size: u32) -> Result<Vec<u8>> {
    const CHUNK: usize = 1024;
    let rounded = (size as usize + 3) & !3;
    let pb = progress_bar(rounded as u64, "reading");
    let mut out = Vec::with_capacity(rounded);
    let mut off = 0usize;
    while off < rounded {
        let len = (rounded - off).min(CHUNK);
        let len = (len + 3) & !3;
        let chunk = mem::read32(session, Region::unbounded(), addr + off as u32, len)?;
        out.extend_from_slice(&chunk);
        off += len;
        pb.inc(len as u64);
    }
    pb.finish_and_clear();
    Ok(out)
}

/// Read `path` in page-sized chunks and compare against device flash
/// contents starting at `addr`.
pub fn check(device: &Path, verbosity: u8, timeout_ms: u32, path: &Path, addr: u32) -> Result<()> {
    let data = read_file(path)?;
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let result = check_against_session(&mut session, &data, addr);
    close(&mut session)?;
    result?;
    println!("{} matches device flash at {:#010x}", path.display(), addr);
    Ok(())
}

fn check_against_session<T: Transport>(session: &mut Session<T>, data: &[u8], addr: u32) -> Result<()> {
    let map = session.memory_map();
    const CHUNK: usize = 1024;
    let page_size = map.flash_page_size as usize;
    let chunk_size = CHUNK.min(page_size.max(4));

    let pb = progress_bar(data.len() as u64, "verifying");
    let mut off = 0usize;
    while off < data.len() {
        let len = (data.len() - off).min(chunk_size);
        let rounded = (len + 3) & !3;
        let device_chunk = mem::read32(session, Region::flash(map), addr + off as u32, rounded)?;
        for i in 0..len {
            if device_chunk[i] != data[off + i] {
                return Err(FlashError::VerifyMismatch {
                    addr: addr + (off + i) as u32,
                    expected: data[off + i],
                    actual: device_chunk[i],
                }
                .into());
            }
        }
        off += len;
        pb.inc(len as u64);
    }
    pb.finish_and_clear();
    Ok(())
}

//! `write-demo` — program a single half-word without the SRAM loader.
//! Thin CLI wrapper over [`stlink_flash::fpec::write_halfword`], grounded
//! in the original's `write` sub-command
//! (`write_flash_mem16(sl, 0x08000ba0, 0xDBEC)`).

use std::path::Path;

use stlink_flash::fpec::{self, DEFAULT_FLASH_DEADLINE};
use stlink_flash::Region;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

pub fn write_demo(device: &Path, verbosity: u8, timeout_ms: u32, addr: u32, value: u16) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let region = Region::flash(session.memory_map());
    fpec::write_halfword(&mut session, region, addr, value, DEFAULT_FLASH_DEADLINE)?;
    println!("wrote {value:#06x} at {addr:#010x}");

    close(&mut session)?;
    Ok(())
}

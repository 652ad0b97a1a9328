//! `info` — flash-size/unique-id block and DBGMCU id. Grounded in the
//! original's `stm_info`.

use std::path::Path;

use stlink_flash::mem;
use stlink_flash::Region;
use stlink_proto::model::memory_map;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

pub fn info(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;

    let flash_size_word = mem::read32(&mut session, Region::unbounded(), memory_map::FLASH_SIZE_REG, 4)?;
    let flash_size_kib = stlink_proto::codec::read_u16_le(&flash_size_word, 0);

    let unique_id = mem::read32(&mut session, Region::unbounded(), memory_map::UNIQUE_ID_BASE, 12)?;

    let dbgmcu = mem::read32(&mut session, Region::unbounded(), memory_map::DBGMCU_IDCODE, 4)?;
    let dbgmcu = stlink_proto::codec::read_u32_le(&dbgmcu, 0);
    let device_id = dbgmcu & 0xFFF;
    let revision_id = (dbgmcu >> 16) & 0xFFFF;

    println!("flash size:    {flash_size_kib} KiB");
    print!("unique id:     ");
    for b in &unique_id {
        print!("{b:02x}");
    }
    println!();
    println!("DBGMCU id:     device={device_id:#05x} revision={revision_id:#06x}");

    close(&mut session)?;
    Ok(())
}

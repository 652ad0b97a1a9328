//! `identify` — open, forced-open, enter SWD, and report what was found.
//! Grounded in the original tool's startup path plus its ad hoc
//! `main()`-level printing of the version/VID/PID/core-id it just read.

use std::path::Path;

use stlink_link::Session;
use stlink_scsi::ScsiTransport;

use super::error::Result;
use super::open::open_and_enter_swd;

pub fn identify(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    print_identity(&session);
    super::open::close(&mut session)?;
    Ok(())
}

fn print_identity(session: &Session<ScsiTransport>) {
    if let Some(v) = session.version() {
        println!(
            "adapter:       ST-Link v{} (JTAG v{}, SWIM v{}), USB {:#06x}:{:#06x}",
            v.stlink_v, v.jtag_v, v.swim_v, v.vendor_id, v.product_id
        );
    }
    println!("adapter mode:  {:?}", session.mode());
    println!(
        "core id:       {:#010x}",
        session.core_id().unwrap_or(0)
    );
    let map = session.memory_map();
    println!(
        "flash:         {:#010x} + {} KiB (page {} B)",
        map.flash_base,
        map.flash_size / 1024,
        map.flash_page_size
    );
    println!(
        "sram:          {:#010x} + {} KiB",
        map.sram_base,
        map.sram_size / 1024
    );
}

//! `regs` — dump the 21-word core register file. Grounded in the
//! original's `stlink_print_arm_regs`.

use std::path::Path;

use stlink_proto::RegisterFile;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

pub fn regs(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let regs = session.read_all_regs()?;
    print_regs(&regs);

    close(&mut session)?;
    Ok(())
}

fn print_regs(regs: &RegisterFile) {
    for (i, r) in regs.r.iter().enumerate() {
        println!("r{i:<2} = {r:#010x}");
    }
    println!("xpsr       = {:#010x}", regs.xpsr);
    println!("main_sp    = {:#010x}", regs.main_sp);
    println!("process_sp = {:#010x}", regs.process_sp);
    println!("rw         = {:#010x}", regs.rw);
    println!("rw2        = {:#010x}", regs.rw2);
}

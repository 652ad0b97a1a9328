//! `run` and `run-at` — resume execution, optionally from a given PC, and
//! wait for the core to halt again (e.g. on a loader breakpoint). Grounded
//! in the original's `stlink_run_at`, with its 3-second poll interval
//! replaced by the 10 ms / bounded-deadline policy spec.md §9 calls for.

use std::path::Path;
use std::time::Duration;

use stlink_link::DEFAULT_POLL_DEADLINE_MS;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

pub fn run(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.run_core()?;
    println!("core resumed");
    close(&mut session)?;
    Ok(())
}

pub fn run_at(device: &Path, verbosity: u8, timeout_ms: u32, addr: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;
    session.write_reg(15, addr)?;
    session.run_core()?;
    session.wait_halted(Duration::from_millis(DEFAULT_POLL_DEADLINE_MS))?;
    println!(
        "core halted at pc={:#010x}",
        session.read_reg(15)?
    );
    close(&mut session)?;
    Ok(())
}

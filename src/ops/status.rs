//! `status` — report core running/halted/unknown. Grounded in the
//! original's `stlink_status`.

use std::path::Path;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

pub fn status(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    let status = session.get_status()?;
    println!("core status: {status:?}");
    close(&mut session)?;
    Ok(())
}

//! `blink` — toggle the Discovery board's onboard LEDs (PC8 blue, PC9
//! green) a fixed number of times, then restore `GPIOC_CRH` to whatever it
//! was before. Grounded in the original's blink demo.

use std::path::Path;
use std::thread;
use std::time::Duration;

use stlink_flash::mem;
use stlink_flash::Region;
use stlink_proto::model::gpioc;

use super::error::Result;
use super::open::{close, open_and_enter_swd};

/// Number of on/off toggles.
const BLINK_COUNT: usize = 10;
/// Delay between toggles.
const BLINK_PERIOD: Duration = Duration::from_millis(200);

/// `GPIOC_CRH` configuration: PC8 and PC9 as 2 MHz push-pull general
/// purpose outputs (`MODE=10`, `CNF=00`), leaving every other pin's
/// configuration bits untouched relative to whatever was read back.
fn with_pc8_pc9_as_outputs(crh: u32) -> u32 {
    let mask = 0xFF << 0; // bits 0..7 cover PC8 (bits 0..3) and PC9 (bits 4..7)
    (crh & !mask) | 0x22
}

pub fn blink(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<()> {
    let mut session = open_and_enter_swd(device, verbosity, timeout_ms)?;
    session.force_debug()?;

    let region = Region::unbounded();
    let original_crh = read_reg(&mut session, region, gpioc::CRH)?;
    write_reg(&mut session, region, gpioc::CRH, with_pc8_pc9_as_outputs(original_crh))?;

    let blue = 1 << gpioc::LED_BLUE_BIT;
    let green = 1 << gpioc::LED_GREEN_BIT;
    for i in 0..BLINK_COUNT {
        let odr = if i % 2 == 0 { blue } else { green };
        write_reg(&mut session, region, gpioc::ODR, odr)?;
        thread::sleep(BLINK_PERIOD);
    }
    write_reg(&mut session, region, gpioc::ODR, 0)?;
    write_reg(&mut session, region, gpioc::CRH, original_crh)?;

    close(&mut session)?;
    Ok(())
}

fn read_reg(
    session: &mut stlink_link::Session<stlink_scsi::ScsiTransport>,
    region: Region,
    addr: u32,
) -> Result<u32> {
    let bytes = mem::read32(session, region, addr, 4)?;
    Ok(stlink_proto::codec::read_u32_le(&bytes, 0))
}

fn write_reg(
    session: &mut stlink_link::Session<stlink_scsi::ScsiTransport>,
    region: Region,
    addr: u32,
    value: u32,
) -> Result<()> {
    mem::write32(session, region, addr, &value.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_config_preserves_bits_above_pc9() {
        let crh = 0xABCD_1234;
        let configured = with_pc8_pc9_as_outputs(crh);
        assert_eq!(configured & 0xFFFF_FF00, crh & 0xFFFF_FF00);
        assert_eq!(configured & 0xFF, 0x22);
    }
}

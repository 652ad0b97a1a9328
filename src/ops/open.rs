//! Device-open and mode-switch sequence shared by every subcommand:
//! open the `/dev/sg*` node, verify the adapter's USB identity, run the
//! forced-open DFU-exit/re-enumeration dance if needed, then enter SWD
//! (which performs the mandatory first `READ_CORE_ID`).

use std::path::Path;
use std::thread;

use stlink_link::mode::{self, ForcedOpenStep};
use stlink_link::Session;
use stlink_proto::model::usb_id;
use stlink_proto::CORTEX_M3_CORE_ID;
use stlink_scsi::ScsiTransport;

use super::error::Result;

/// Open `device`, run the forced-open sequence, and enter SWD debug mode.
/// Returns the session with mode `Debug(Swd)` and the core id already
/// validated (a mismatch is a warning, logged by [`Session::read_core_id`],
/// not a hard error — spec.md §7 `UnexpectedCoreId`).
pub fn open_and_enter_swd(device: &Path, verbosity: u8, timeout_ms: u32) -> Result<Session<ScsiTransport>> {
    let device = device.to_string_lossy().into_owned();
    let mut session = open_checked(&device, verbosity, timeout_ms)?;

    match mode::begin_forced_open(&mut session)? {
        ForcedOpenStep::AlreadyUsable(_) => {}
        ForcedOpenStep::NeedsReopen {
            dfu_settle,
            reenum_settle,
        } => {
            log::info!("stlinkv1: adapter left DFU mode, waiting for USB re-enumeration");
            thread::sleep(dfu_settle);
            drop(session);
            thread::sleep(reenum_settle);
            session = open_checked(&device, verbosity, timeout_ms)?;
        }
    }

    let core_id = session.enter_swd()?;
    if core_id != CORTEX_M3_CORE_ID {
        log::warn!(
            "stlinkv1: core id {core_id:#010x} does not match the expected Cortex-M3 id {:#010x}",
            CORTEX_M3_CORE_ID
        );
    }
    Ok(session)
}

fn open_checked(device: &str, verbosity: u8, timeout_ms: u32) -> Result<Session<ScsiTransport>> {
    let transport = ScsiTransport::open(device)?;
    let mut session = Session::new(transport, verbosity);
    session.set_timeout_ms(timeout_ms);
    let version = session.get_version()?;
    mode::check_usb_identity(version, usb_id::VENDOR_ID, usb_id::PRODUCT_ID)?;
    Ok(session)
}

/// Return the adapter to mass-storage mode. Called on every exit path,
/// mirroring the scoped-release semantics spec.md §5 requires of a close.
pub fn close(session: &mut Session<ScsiTransport>) -> Result<()> {
    if matches!(session.mode(), Some(stlink_proto::AdapterMode::Debug(_))) {
        session.exit_debug()?;
    }
    Ok(())
}

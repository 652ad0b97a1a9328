//! Adapter mode transitions and the forced-open sequence.
//!
//! The adapter boots into whichever mode it was last left in. If that
//! happens to be DFU, no debug or mass-storage CDB will be answered until
//! it is told to exit DFU — which makes the device re-enumerate on the USB
//! bus and its `/dev/sg*` node disappear and reappear under a (usually,
//! but not necessarily, identical) path.

use std::time::Duration;

use stlink_proto::AdapterMode;

use crate::error::{LinkError, Result};
use crate::session::Session;
use crate::transport::Transport;

/// How long to wait after telling the adapter to exit DFU mode before
/// closing our handle to it.
pub const DFU_EXIT_SETTLE_MS: u64 = 1_000;

/// How long to wait for USB re-enumeration before reopening the device
/// node.
pub const REENUMERATION_SETTLE_MS: u64 = 5_000;

/// Run the forced-open sequence against an already-open session: query the
/// current mode, and if it reports DFU, exit DFU and ask the caller to
/// reopen the device, returning the settle durations the caller should
/// sleep for between steps. The re-open itself is left to the caller
/// because only it owns the concrete transport's open routine (a fresh
/// `/dev/sg*` handle, possibly at a different path after re-enumeration).
pub enum ForcedOpenStep {
    /// The adapter was not in DFU mode; nothing further to do.
    AlreadyUsable(AdapterMode),
    /// DFU was exited; the caller must sleep `dfu_settle`, close this
    /// session, sleep `reenum_settle`, then reopen and re-query version.
    NeedsReopen {
        dfu_settle: Duration,
        reenum_settle: Duration,
    },
}

pub fn begin_forced_open<T: Transport>(session: &mut Session<T>) -> Result<ForcedOpenStep> {
    let mode = session.get_current_mode()?;
    if matches!(mode, AdapterMode::Dfu) {
        session.dfu_exit()?;
        Ok(ForcedOpenStep::NeedsReopen {
            dfu_settle: Duration::from_millis(DFU_EXIT_SETTLE_MS),
            reenum_settle: Duration::from_millis(REENUMERATION_SETTLE_MS),
        })
    } else {
        Ok(ForcedOpenStep::AlreadyUsable(mode))
    }
}

/// Validate that a freshly (re)opened adapter matches the expected ST-Link
/// v1 USB identity. The forced-open routine never retries a mismatch; it
/// is treated as a hard error, mirroring the original tool's behavior of
/// aborting outright rather than guessing at a different device.
pub fn check_usb_identity(
    version: stlink_proto::AdapterVersion,
    expected_vid: u16,
    expected_pid: u16,
) -> Result<()> {
    if version.vendor_id != expected_vid || version.product_id != expected_pid {
        return Err(LinkError::WrongDevice {
            expected_vid,
            expected_pid,
            actual_vid: version.vendor_id,
            actual_pid: version.product_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};

    #[test]
    fn already_mass_mode_skips_the_dfu_dance() {
        let mut transport = MockTransport::default();
        transport.push_reply(Reply::Read(vec![stlink_proto::opcode::mode::MASS, 0]));
        let mut session = Session::new(transport, 0);

        let step = begin_forced_open(&mut session).unwrap();
        assert!(matches!(step, ForcedOpenStep::AlreadyUsable(AdapterMode::Mass)));
    }

    #[test]
    fn dfu_mode_triggers_exit_and_reopen_request() {
        let mut transport = MockTransport::default();
        transport.push_reply(Reply::Read(vec![stlink_proto::opcode::mode::DFU, 0]));
        transport.push_reply(Reply::None);
        let mut session = Session::new(transport, 0);

        let step = begin_forced_open(&mut session).unwrap();
        assert!(matches!(step, ForcedOpenStep::NeedsReopen { .. }));
    }

    #[test]
    fn wrong_usb_identity_is_rejected() {
        let version = stlink_proto::AdapterVersion {
            stlink_v: 1,
            jtag_v: 1,
            swim_v: 1,
            vendor_id: 0x1234,
            product_id: 0x5678,
        };
        let err = check_usb_identity(version, 0x0483, 0x3744).unwrap_err();
        assert!(matches!(err, LinkError::WrongDevice { .. }));
    }
}

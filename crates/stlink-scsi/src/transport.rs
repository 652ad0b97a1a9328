//! `SG_IO` SCSI generic pass-through transport.
//!
//! The ST-Link v1 enumerates as a USB mass-storage device; in mass-storage
//! mode its firmware accepts vendor CDBs (opcode classes 0xF1-0xF5) through
//! the same Bulk-Only Transport the kernel's `sg` driver already speaks, so
//! we drive it with the generic `/dev/sg*` node rather than talking USB
//! directly.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

use stlink_proto::opcode::CDB_LEN;

use crate::error::{Result, ScsiError};

/// Direction of the data phase of a SCSI command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No data phase.
    None,
    /// Host reads from the device.
    FromDevice,
    /// Host writes to the device.
    ToDevice,
}

impl Direction {
    fn sg_dxfer_direction(self) -> libc::c_int {
        match self {
            Direction::None => -1,
            Direction::ToDevice => -2,
            Direction::FromDevice => -3,
        }
    }
}

const SCSI_STATUS_GOOD: u8 = 0x00;
const SCSI_STATUS_CHECK_CONDITION: u8 = 0x02;
const SENSE_BUFFER_LEN: usize = 18;

/// `struct sg_io_hdr` from `<scsi/sg.h>`. Field layout and types must match
/// the kernel ABI exactly; this is passed by pointer across the ioctl
/// boundary, not derived from it.
#[repr(C)]
#[derive(Debug)]
struct SgIoHdr {
    interface_id: libc::c_int,
    dxfer_direction: libc::c_int,
    cmd_len: u8,
    mx_sb_len: u8,
    iovec_count: u16,
    dxfer_len: u32,
    dxferp: *mut libc::c_void,
    cmdp: *const u8,
    sbp: *mut u8,
    timeout: u32,
    flags: u32,
    pack_id: libc::c_int,
    usr_ptr: *mut libc::c_void,
    status: u8,
    masked_status: u8,
    msg_status: u8,
    sb_len_wr: u8,
    host_status: u16,
    driver_status: u16,
    resid: libc::c_int,
    duration: u32,
    info: u32,
}

impl Default for SgIoHdr {
    fn default() -> Self {
        SgIoHdr {
            interface_id: b'S' as libc::c_int,
            dxfer_direction: 0,
            cmd_len: 0,
            mx_sb_len: 0,
            iovec_count: 0,
            dxfer_len: 0,
            dxferp: std::ptr::null_mut(),
            cmdp: std::ptr::null(),
            sbp: std::ptr::null_mut(),
            timeout: 0,
            flags: 0,
            pack_id: 0,
            usr_ptr: std::ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        }
    }
}

/// `SG_IO` ioctl request number, `<scsi/sg.h>`.
const SG_IO: libc::c_ulong = 0x2285;

/// Outcome of one SCSI pass-through transaction. The adapter's Bulk-Only
/// residue field is never trusted: every known ST-Link v1 firmware reports
/// stale residue values on several command classes, so the data actually
/// moved is taken to be exactly `requested_len` whenever `status` is good.
#[derive(Debug, Clone, Copy)]
pub struct TransferOutcome {
    pub status: u8,
}

/// A `/dev/sg*` node opened for SCSI generic pass-through.
pub struct ScsiTransport {
    file: File,
    path: String,
}

impl ScsiTransport {
    /// Open the generic SCSI device node at `path` (e.g. `/dev/sg3`).
    pub fn open(path: &str) -> Result<Self> {
        log::debug!("scsi: opening {path}");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ScsiError::OpenFailed {
                path: path.to_string(),
                source,
            })?;
        Ok(ScsiTransport {
            file,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Issue a command with no data phase.
    pub fn execute_none(&mut self, cdb: &[u8; CDB_LEN], timeout_ms: u32) -> Result<TransferOutcome> {
        self.execute(cdb, Direction::None, std::ptr::null_mut(), 0, timeout_ms)
    }

    /// Issue a command and read `buf.len()` bytes back from the device.
    pub fn execute_read(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<TransferOutcome> {
        let ptr = buf.as_mut_ptr() as *mut libc::c_void;
        self.execute(cdb, Direction::FromDevice, ptr, buf.len(), timeout_ms)
    }

    /// Issue a command and write `buf` to the device.
    pub fn execute_write(
        &mut self,
        cdb: &[u8; CDB_LEN],
        buf: &[u8],
        timeout_ms: u32,
    ) -> Result<TransferOutcome> {
        // The kernel only reads from this buffer for a TO_DEV transfer; the
        // ioctl signature requires a non-const pointer regardless.
        let ptr = buf.as_ptr() as *mut libc::c_void;
        self.execute(cdb, Direction::ToDevice, ptr, buf.len(), timeout_ms)
    }

    fn execute(
        &mut self,
        cdb: &[u8; CDB_LEN],
        direction: Direction,
        dxferp: *mut libc::c_void,
        dxfer_len: usize,
        timeout_ms: u32,
    ) -> Result<TransferOutcome> {
        if dxfer_len > u32::MAX as usize {
            return Err(ScsiError::BufferTooLarge(dxfer_len));
        }

        let mut sense = [0u8; SENSE_BUFFER_LEN];
        let mut hdr = SgIoHdr {
            dxfer_direction: direction.sg_dxfer_direction(),
            cmd_len: CDB_LEN as u8,
            mx_sb_len: SENSE_BUFFER_LEN as u8,
            dxfer_len: dxfer_len as u32,
            dxferp,
            cmdp: cdb.as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: timeout_ms,
            ..Default::default()
        };

        let fd = self.file.as_raw_fd();
        let ret = unsafe { libc::ioctl(fd, SG_IO, &mut hdr as *mut SgIoHdr) };
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ETIMEDOUT) {
                return Err(ScsiError::Timeout {
                    requested: dxfer_len,
                    timeout_ms,
                });
            }
            return Err(ScsiError::IoctlFailed(err));
        }

        if hdr.host_status != 0 {
            return Err(ScsiError::HostError {
                host_status: hdr.host_status,
            });
        }
        if hdr.driver_status != 0 {
            return Err(ScsiError::DriverError {
                driver_status: hdr.driver_status,
            });
        }
        if hdr.status == SCSI_STATUS_CHECK_CONDITION {
            return Err(ScsiError::CheckCondition {
                sense_key: sense[2] & 0x0F,
                sense,
            });
        }
        if hdr.status != SCSI_STATUS_GOOD {
            log::warn!("scsi: non-good status {:#04x} on {}", hdr.status, self.path);
        } else if hdr.resid != 0 {
            // The transfer is still taken as having moved dxfer_len bytes
            // (see TransferOutcome's doc comment); this is visibility into
            // the adapter's stale-residue quirk, not a length correction.
            log::debug!(
                "scsi: good status with nonzero residue {} on {}",
                hdr.resid,
                self.path
            );
        }

        Ok(TransferOutcome { status: hdr.status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_maps_to_the_sg_dxfer_constants() {
        assert_eq!(Direction::None.sg_dxfer_direction(), -1);
        assert_eq!(Direction::ToDevice.sg_dxfer_direction(), -2);
        assert_eq!(Direction::FromDevice.sg_dxfer_direction(), -3);
    }

    #[test]
    fn default_header_carries_the_scsi_generic_interface_id() {
        let hdr = SgIoHdr::default();
        assert_eq!(hdr.interface_id, b'S' as libc::c_int);
        assert_eq!(hdr.dxfer_len, 0);
        assert!(hdr.dxferp.is_null());
    }
}

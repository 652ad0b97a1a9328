//! Errors for the `SG_IO` SCSI pass-through transport.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScsiError {
    #[error("failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("SG_IO ioctl failed: {0}")]
    IoctlFailed(#[source] std::io::Error),

    #[error("adapter reported a check condition (sense key {sense_key:#04x})")]
    CheckCondition { sense_key: u8, sense: [u8; 18] },

    #[error("adapter reported host error (host_status={host_status:#06x})")]
    HostError { host_status: u16 },

    #[error("adapter reported driver error (driver_status={driver_status:#06x})")]
    DriverError { driver_status: u16 },

    #[error("transfer of {requested} bytes timed out after {timeout_ms} ms")]
    Timeout { requested: usize, timeout_ms: u32 },

    #[error("data buffer of {0} bytes exceeds the adapter's maximum transfer size")]
    BufferTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, ScsiError>;

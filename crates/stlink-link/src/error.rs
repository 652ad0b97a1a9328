//! Errors from the adapter session and command layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Transport(#[from] stlink_scsi::ScsiError),

    #[error("adapter reported VID:PID {actual_vid:#06x}:{actual_pid:#06x}, expected {expected_vid:#06x}:{expected_pid:#06x}")]
    WrongDevice {
        expected_vid: u16,
        expected_pid: u16,
        actual_vid: u16,
        actual_pid: u16,
    },

    #[error(transparent)]
    Proto(#[from] stlink_proto::ProtoError),

    #[error("operation requires the core halted, but its last-known status is {actual:?}")]
    ModeError { actual: Option<stlink_proto::CoreStatus> },

    #[error("register index {0} is out of range (0..={max})", max = stlink_proto::opcode::NUM_REGS - 1)]
    InvalidRegisterIndex(u8),

    #[error("core did not reach the halted state within {0} ms")]
    CoreNeverHalted(u64),

    #[error("reply length {actual} does not match the expected {expected} bytes for this command")]
    UnexpectedReplyLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, LinkError>;

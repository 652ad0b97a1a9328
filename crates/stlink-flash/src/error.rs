//! Errors from the target memory engine and the flash engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlashError {
    #[error(transparent)]
    Link(#[from] stlink_link::LinkError),

    #[error("address {addr:#010x} is not aligned to {align} bytes")]
    Misaligned { addr: u32, align: u32 },

    #[error("address {addr:#010x} (length {len}) is outside the target region {region_base:#010x}..{region_end:#010x}")]
    AddressOutOfRange {
        addr: u32,
        len: usize,
        region_base: u32,
        region_end: u32,
    },

    #[error("address {addr:#010x} plus length {len} overflows a 32-bit address space")]
    RangeOverflow { addr: u32, len: usize },
    #[error("read of {len} bytes exceeds the {max}-byte READ_MEM_32BIT ceiling; the caller must chunk")]
    LengthTooLarge { len: usize, max: usize },

    #[error("the FPEC lock bit did not clear after writing the unlock key sequence")]
    FlashLockStuck,

    #[error("the FPEC reported a programming error (SR={sr:#010x}) while writing {addr:#010x}")]
    FlashProgramError { addr: u32, sr: u32 },

    #[error("the SRAM loader exited with {remaining} half-words left unwritten at target {addr:#010x}")]
    FlashWriteIncomplete { addr: u32, remaining: u32 },

    #[error("verification mismatch at {addr:#010x}: expected {expected:#04x}, found {actual:#04x}")]
    VerifyMismatch { addr: u32, expected: u8, actual: u8 },

    #[error("operation at {addr:#010x} did not complete within {timeout_ms} ms")]
    Timeout { addr: u32, timeout_ms: u64 },
}

pub type Result<T> = std::result::Result<T, FlashError>;

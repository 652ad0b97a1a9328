//! Errors for malformed protocol replies. Transport- and session-level
//! errors live in `stlink-scsi` and `stlink-link` respectively; this crate
//! only covers decoding the wire format itself.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("reply too short: expected at least {expected} bytes, got {actual}")]
    ReplyTooShort { expected: usize, actual: usize },
}

pub type Result<T> = core::result::Result<T, ProtoError>;

//! Top-level error type for the high-level operations: wraps every layer's
//! error plus the file I/O failures the distilled spec treats as an
//! external collaborator's concern (`FileError` in spec.md §7).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Flash(#[from] stlink_flash::FlashError),

    #[error(transparent)]
    Link(#[from] stlink_link::LinkError),

    #[error(transparent)]
    Scsi(#[from] stlink_scsi::ScsiError),

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file length {len} is not 2-byte aligned, required for a flash write at {addr:#010x}")]
    FileMisaligned { addr: u32, len: usize },

    #[error("file of {len} bytes does not fit in the {region} region ({region_size} bytes) at {addr:#010x}")]
    FileTooLarge {
        addr: u32,
        len: usize,
        region: &'static str,
        region_size: u32,
    },
}

pub type Result<T> = std::result::Result<T, OpError>;

pub(crate) fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| OpError::File {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_file(path: &std::path::Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).map_err(|source| OpError::File {
        path: path.to_path_buf(),
        source,
    })
}

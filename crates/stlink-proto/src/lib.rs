//! Wire-level types and byte codec for the ST-Link v1 SCSI pass-through
//! protocol: CDB opcode constants, CDB builders, and the target data model
//! (register file, adapter mode, core status, STM32F10x memory map, FPEC
//! register layout). No I/O happens in this crate; `stlink-scsi` and
//! `stlink-link` build on top of it.

pub mod cdb;
pub mod codec;
pub mod error;
pub mod model;
pub mod opcode;

pub use error::{ProtoError, Result};
pub use model::{
    AdapterMode, AdapterVersion, CoreStatus, DebugInterface, RegisterFile, CORTEX_M3_CORE_ID,
};

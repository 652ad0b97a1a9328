//! `SG_IO`-based SCSI generic pass-through transport for the ST-Link v1
//! when it is sitting in mass-storage mode.
//!
//! This is the lowest transport layer: it knows how to shuttle a 10-byte
//! CDB and an optional data phase through `/dev/sg*`, and nothing about
//! what the CDBs mean. `stlink-link` builds the command layer on top.

pub mod error;
pub mod transport;

pub use error::{Result, ScsiError};
pub use transport::{Direction, ScsiTransport, TransferOutcome};

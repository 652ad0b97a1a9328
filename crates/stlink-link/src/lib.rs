//! The ST-Link v1 adapter session and typed command layer: version query,
//! mode query/transition, core control, register read/write, memory
//! read/write, breakpoint set/clear, plus the mode state machine and the
//! forced-open sequence. Built on `stlink-scsi`'s raw CDB transport.

pub mod error;
pub mod mode;
pub mod session;
pub mod transport;

pub use error::{LinkError, Result};
pub use session::{MemoryMap, Session, DEFAULT_CDB_TIMEOUT_MS, DEFAULT_POLL_DEADLINE_MS, POLL_INTERVAL_MS};
pub use transport::Transport;

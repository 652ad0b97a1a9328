//! Target memory engine (`mem`) and FPEC flash engine (`fpec`) for the
//! STM32F10x target behind an ST-Link v1 adapter.

pub mod error;
pub mod fpec;
pub mod mem;

pub use error::{FlashError, Result};
pub use mem::Region;

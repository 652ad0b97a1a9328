//! CDB opcode classes and debug sub-op codes for the ST-Link v1 protocol.
//!
//! Every CDB sent to the adapter is exactly [`CDB_LEN`] bytes; byte 0 is the
//! top-level opcode class below, unused bytes are zero.

/// Length in bytes of every CDB the adapter accepts.
pub const CDB_LEN: usize = 10;

/// Top-level opcode classes (CDB byte 0).
pub mod class {
    /// Get firmware version.
    pub const GET_VERSION: u8 = 0xF1;
    /// Debug command (most operations); byte 1 selects the sub-op.
    pub const DEBUG_COMMAND: u8 = 0xF2;
    /// DFU command; byte 1 selects the sub-op.
    pub const DFU_COMMAND: u8 = 0xF3;
    /// Get current adapter mode.
    pub const GET_CURRENT_MODE: u8 = 0xF5;
}

/// Debug sub-ops (CDB byte 1, when byte 0 is [`class::DEBUG_COMMAND`]).
pub mod debug {
    /// Enter JTAG (paired with [`ENTER`]).
    pub const ENTER_JTAG: u8 = 0x00;
    /// Get core status.
    pub const GET_STATUS: u8 = 0x01;
    /// Force the core into debug/halted state.
    pub const FORCE_DEBUG: u8 = 0x02;
    /// Reset the system, leaving the core halted.
    pub const RESET_SYS: u8 = 0x03;
    /// Read all core registers (84-byte reply).
    pub const READ_ALL_REGS: u8 = 0x04;
    /// Read a single register; byte 2 is the index.
    pub const READ_REG: u8 = 0x05;
    /// Write a single register; byte 2 is the index, bytes 3..7 the LE value.
    pub const WRITE_REG: u8 = 0x06;
    /// Read target memory, 32-bit transfer; bytes 2..6 addr, 6..8 length.
    pub const READ_MEM_32BIT: u8 = 0x07;
    /// Write target memory, 32-bit transfer; same layout as [`READ_MEM_32BIT`].
    pub const WRITE_MEM_32BIT: u8 = 0x08;
    /// Resume core execution.
    pub const RUN_CORE: u8 = 0x09;
    /// Single-step the core.
    pub const STEP_CORE: u8 = 0x0A;
    /// Set a hardware (flash patch) breakpoint.
    pub const SET_FP: u8 = 0x0B;
    /// Write target memory, 8-bit transfer; bytes 2..6 addr, 6..8 length.
    pub const WRITE_MEM_8BIT: u8 = 0x0D;
    /// Clear a hardware breakpoint.
    pub const CLEAR_FP: u8 = 0x0E;
    /// Write a debug-module register; bytes 2..6 addr, 6..10 LE value.
    pub const WRITE_DEBUG_REG: u8 = 0x0F;
    /// Enter debug mode (paired with [`ENTER_SWD`] or [`ENTER_JTAG`]).
    pub const ENTER: u8 = 0x20;
    /// Exit debug mode, returning to mass-storage mode.
    pub const EXIT: u8 = 0x21;
    /// Read the Cortex-M core id (4-byte reply); mandatory first Debug
    /// transaction after [`ENTER_SWD`].
    pub const READ_CORE_ID: u8 = 0x22;
    /// Enter SWD (paired with [`ENTER`]).
    pub const ENTER_SWD: u8 = 0xA3;
}

/// DFU sub-ops (CDB byte 1, when byte 0 is [`class::DFU_COMMAND`]).
pub mod dfu {
    /// Exit DFU mode back to mass-storage mode.
    pub const EXIT: u8 = 0x07;
}

/// Simple-command status byte values (most commands' 2-byte reply, byte 0).
pub mod status {
    /// Generic OK / core running.
    pub const OK: u8 = 0x80;
    /// Generic FALSE / core halted.
    pub const FALSE: u8 = 0x81;
}

/// Adapter mode byte values (`GET_CURRENT_MODE` reply, byte 0).
pub mod mode {
    pub const DFU: u8 = 0x00;
    pub const MASS: u8 = 0x01;
    pub const DEBUG: u8 = 0x02;
}

/// Byte length of a [`READ_ALL_REGS`] reply: r0..r15, xpsr, main_sp,
/// process_sp, rw, rw2 — 21 × 4 bytes.
pub const ALL_REGS_LEN: usize = 84;

/// Number of addressable core registers (r0..r15, xpsr, main_sp, process_sp,
/// rw, rw2).
pub const NUM_REGS: usize = 21;

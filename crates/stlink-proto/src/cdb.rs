//! Builders for the fixed-length CDBs the adapter expects.
//!
//! Every builder returns a full [`crate::opcode::CDB_LEN`]-byte array with
//! unused trailing bytes left zero, matching what the adapter's firmware
//! actually inspects.

use crate::codec::{write_u16_le, write_u32_le};
use crate::opcode::{class, debug, dfu, CDB_LEN};

fn empty() -> [u8; CDB_LEN] {
    [0u8; CDB_LEN]
}

/// `GET_VERSION` (0xF1).
pub fn get_version() -> [u8; CDB_LEN] {
    let mut cdb = empty();
    cdb[0] = class::GET_VERSION;
    cdb
}

/// `GET_CURRENT_MODE` (0xF5).
pub fn get_current_mode() -> [u8; CDB_LEN] {
    let mut cdb = empty();
    cdb[0] = class::GET_CURRENT_MODE;
    cdb
}

/// DFU `EXIT` (0xF3 0x07).
pub fn dfu_exit() -> [u8; CDB_LEN] {
    let mut cdb = empty();
    cdb[0] = class::DFU_COMMAND;
    cdb[1] = dfu::EXIT;
    cdb
}

fn debug_cdb(sub_op: u8) -> [u8; CDB_LEN] {
    let mut cdb = empty();
    cdb[0] = class::DEBUG_COMMAND;
    cdb[1] = sub_op;
    cdb
}

/// `ENTER` + `ENTER_SWD` (0xF2 0x20 0xA3) — begin an SWD debug session.
pub fn enter_swd() -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::ENTER);
    cdb[2] = debug::ENTER_SWD;
    cdb
}

/// `ENTER` + `ENTER_JTAG` (0xF2 0x20 0x00) — begin a JTAG debug session.
pub fn enter_jtag() -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::ENTER);
    cdb[2] = debug::ENTER_JTAG;
    cdb
}

/// Debug `EXIT` (0xF2 0x21) — leave debug mode, back to mass-storage mode.
pub fn exit_debug() -> [u8; CDB_LEN] {
    debug_cdb(debug::EXIT)
}

/// `READ_CORE_ID` (0xF2 0x22).
pub fn read_core_id() -> [u8; CDB_LEN] {
    debug_cdb(debug::READ_CORE_ID)
}

/// `GET_STATUS` (0xF2 0x01).
pub fn get_status() -> [u8; CDB_LEN] {
    debug_cdb(debug::GET_STATUS)
}

/// `FORCE_DEBUG` (0xF2 0x02).
pub fn force_debug() -> [u8; CDB_LEN] {
    debug_cdb(debug::FORCE_DEBUG)
}

/// `RESET_SYS` (0xF2 0x03).
pub fn reset_sys() -> [u8; CDB_LEN] {
    debug_cdb(debug::RESET_SYS)
}

/// `READ_ALL_REGS` (0xF2 0x04).
pub fn read_all_regs() -> [u8; CDB_LEN] {
    debug_cdb(debug::READ_ALL_REGS)
}

/// `READ_REG` (0xF2 0x05 idx).
pub fn read_reg(index: u8) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::READ_REG);
    cdb[2] = index;
    cdb
}

/// `WRITE_REG` (0xF2 0x06 idx value_le32).
pub fn write_reg(index: u8, value: u32) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::WRITE_REG);
    cdb[2] = index;
    write_u32_le(&mut cdb, 3, value);
    cdb
}

/// `READ_MEM_32BIT` (0xF2 0x07 addr_le32 len_le16).
pub fn read_mem_32bit(addr: u32, len: u16) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::READ_MEM_32BIT);
    write_u32_le(&mut cdb, 2, addr);
    write_u16_le(&mut cdb, 6, len);
    cdb
}

/// `WRITE_MEM_32BIT` (0xF2 0x08 addr_le32 len_le16); the payload itself
/// travels in the data-out phase, not the CDB.
pub fn write_mem_32bit(addr: u32, len: u16) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::WRITE_MEM_32BIT);
    write_u32_le(&mut cdb, 2, addr);
    write_u16_le(&mut cdb, 6, len);
    cdb
}

/// `WRITE_MEM_8BIT` (0xF2 0x0D addr_le32 len_le16); payload in data-out.
pub fn write_mem_8bit(addr: u32, len: u16) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::WRITE_MEM_8BIT);
    write_u32_le(&mut cdb, 2, addr);
    write_u16_le(&mut cdb, 6, len);
    cdb
}

/// `RUN_CORE` (0xF2 0x09).
pub fn run_core() -> [u8; CDB_LEN] {
    debug_cdb(debug::RUN_CORE)
}

/// `STEP_CORE` (0xF2 0x0A).
pub fn step_core() -> [u8; CDB_LEN] {
    debug_cdb(debug::STEP_CORE)
}

/// `SET_FP` (0xF2 0x0B addr_le32); fixed breakpoint on the given address.
pub fn set_fp(addr: u32) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::SET_FP);
    write_u32_le(&mut cdb, 2, addr);
    cdb
}

/// `CLEAR_FP` (0xF2 0x0E addr_le32).
pub fn clear_fp(addr: u32) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::CLEAR_FP);
    write_u32_le(&mut cdb, 2, addr);
    cdb
}

/// `WRITE_DEBUG_REG` (0xF2 0x0F addr_le32 value_le32).
pub fn write_debug_reg(addr: u32, value: u32) -> [u8; CDB_LEN] {
    let mut cdb = debug_cdb(debug::WRITE_DEBUG_REG);
    write_u32_le(&mut cdb, 2, addr);
    write_u32_le(&mut cdb, 6, value);
    cdb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_swd_matches_the_documented_byte_layout() {
        let cdb = enter_swd();
        assert_eq!(cdb[0], class::DEBUG_COMMAND);
        assert_eq!(cdb[1], debug::ENTER);
        assert_eq!(cdb[2], debug::ENTER_SWD);
        assert!(cdb[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_mem_32bit_encodes_addr_and_len_little_endian() {
        let cdb = read_mem_32bit(0x2000_0100, 0x0040);
        assert_eq!(cdb[0], class::DEBUG_COMMAND);
        assert_eq!(cdb[1], debug::READ_MEM_32BIT);
        assert_eq!(&cdb[2..6], &[0x00, 0x01, 0x00, 0x20]);
        assert_eq!(&cdb[6..8], &[0x40, 0x00]);
    }

    #[test]
    fn write_reg_encodes_index_and_value() {
        let cdb = write_reg(13, 0x2000_1000);
        assert_eq!(cdb[2], 13);
        assert_eq!(&cdb[3..7], &[0x00, 0x10, 0x00, 0x20]);
    }

    #[test]
    fn write_debug_reg_encodes_addr_then_value() {
        let cdb = write_debug_reg(crate::model::fpec::CR, crate::model::fpec::CR_STRT);
        assert_eq!(&cdb[2..6], &crate::model::fpec::CR.to_le_bytes());
        assert_eq!(&cdb[6..10], &crate::model::fpec::CR_STRT.to_le_bytes());
    }
}

//! Target-side data model: register file, adapter/core state, and the
//! STM32F10x memory map and FPEC register layout.

/// Snapshot of the Cortex-M3 core register file as returned by
/// `debug::READ_ALL_REGS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterFile {
    pub r: [u32; 16],
    pub xpsr: u32,
    pub main_sp: u32,
    pub process_sp: u32,
    pub rw: u32,
    pub rw2: u32,
}

impl RegisterFile {
    /// Number of `u32` words in [`crate::opcode::ALL_REGS_LEN`].
    pub const NUM_WORDS: usize = crate::opcode::NUM_REGS;

    /// Parse a [`crate::opcode::ALL_REGS_LEN`]-byte reply into a register
    /// file. Returns [`crate::error::ProtoError::ReplyTooShort`] if `buf` is
    /// shorter than that.
    pub fn from_wire(buf: &[u8]) -> crate::error::Result<Self> {
        if buf.len() < crate::opcode::ALL_REGS_LEN {
            return Err(crate::error::ProtoError::ReplyTooShort {
                expected: crate::opcode::ALL_REGS_LEN,
                actual: buf.len(),
            });
        }
        let mut words = [0u32; Self::NUM_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = crate::codec::read_u32_le(buf, i * 4);
        }
        Ok(RegisterFile {
            r: words[0..16].try_into().expect("16 general registers"),
            xpsr: words[16],
            main_sp: words[17],
            process_sp: words[18],
            rw: words[19],
            rw2: words[20],
        })
    }

    /// Program counter, r15.
    pub fn pc(&self) -> u32 {
        self.r[15]
    }

    /// Stack pointer, r13.
    pub fn sp(&self) -> u32 {
        self.r[13]
    }
}

/// Which mode the adapter currently reports via `GET_CURRENT_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterMode {
    Dfu,
    Mass,
    Debug(DebugInterface),
    /// The adapter reported a mode byte we don't recognize.
    Unknown(u8),
}

/// Which low-level debug interface is active once in [`AdapterMode::Debug`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugInterface {
    Swd,
    Jtag,
}

impl AdapterMode {
    /// Decode the mode byte from a `GET_CURRENT_MODE` reply. The reply does
    /// not distinguish SWD from JTAG while in debug mode; callers that need
    /// that distinction track it themselves from which `ENTER_*` op they
    /// last issued.
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            crate::opcode::mode::DFU => AdapterMode::Dfu,
            crate::opcode::mode::MASS => AdapterMode::Mass,
            crate::opcode::mode::DEBUG => AdapterMode::Debug(DebugInterface::Swd),
            other => AdapterMode::Unknown(other),
        }
    }
}

/// Run/halt state of the target core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreStatus {
    Running,
    Halted,
    /// The adapter returned a status byte that is neither
    /// [`crate::opcode::status::OK`] nor [`crate::opcode::status::FALSE`].
    Unknown(u8),
}

impl CoreStatus {
    pub fn from_wire(byte: u8) -> Self {
        match byte {
            crate::opcode::status::OK => CoreStatus::Running,
            crate::opcode::status::FALSE => CoreStatus::Halted,
            other => CoreStatus::Unknown(other),
        }
    }
}

/// Expected value of `debug::READ_CORE_ID` on a genuine Cortex-M3.
pub const CORTEX_M3_CORE_ID: u32 = 0x1BA0_1477;

/// Parsed reply to `class::GET_VERSION` (6 bytes). The version nibbles are
/// a packed bitfield across the first two bytes, not a little-endian word;
/// the vendor/product id halves that follow are ordinary LE `u16`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterVersion {
    pub stlink_v: u8,
    pub jtag_v: u8,
    pub swim_v: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl AdapterVersion {
    /// Byte length of the `GET_VERSION` reply.
    pub const WIRE_LEN: usize = 6;

    pub fn from_wire(buf: &[u8; Self::WIRE_LEN]) -> Self {
        let (b0, b1) = (buf[0] as u32, buf[1] as u32);
        AdapterVersion {
            stlink_v: ((b0 & 0xf0) >> 4) as u8,
            jtag_v: (((b0 & 0x0f) << 2) | ((b1 & 0xc0) >> 6)) as u8,
            swim_v: (b1 & 0x3f) as u8,
            vendor_id: crate::codec::read_u16_le(buf, 2),
            product_id: crate::codec::read_u16_le(buf, 4),
        }
    }
}

/// STM32F10x medium-density memory layout, as assumed by the flash engine
/// and by `info()`.
pub mod memory_map {
    /// Start of the main flash region.
    pub const FLASH_BASE: u32 = 0x0800_0000;
    /// Size of the main flash region (128 KiB, medium-density devices).
    pub const FLASH_SIZE: u32 = 128 * 1024;
    /// Flash page size; erase and the loader both work in page units.
    pub const FLASH_PAGE_SIZE: u32 = 1024;
    /// Start of SRAM.
    pub const SRAM_BASE: u32 = 0x2000_0000;
    /// Size of SRAM (8 KiB, medium-density devices).
    pub const SRAM_SIZE: u32 = 8 * 1024;
    /// Start of the system memory area (factory bootloader).
    pub const SYSTEM_BASE: u32 = 0x1FFF_F000;
    /// Size of the system memory area.
    pub const SYSTEM_SIZE: u32 = 2 * 1024;

    /// 96-bit factory-programmed unique device id.
    pub const UNIQUE_ID_BASE: u32 = 0x1FFF_F7E8;
    /// Option bytes / flash size register.
    pub const FLASH_SIZE_REG: u32 = 0x1FFF_F7E0;
    /// DBGMCU_IDCODE: device id + revision, read-only.
    pub const DBGMCU_IDCODE: u32 = 0xE004_2000;
}

/// GPIOC register block and the Discovery board's onboard LED bits, used by
/// the `blink` operation.
pub mod gpioc {
    pub const BASE: u32 = 0x4001_1000;
    pub const CRH: u32 = BASE + 0x04;
    pub const ODR: u32 = BASE + 0x0C;

    /// Blue LED, PC8.
    pub const LED_BLUE_BIT: u32 = 8;
    /// Green LED, PC9.
    pub const LED_GREEN_BIT: u32 = 9;
}

/// USB identity the adapter enumerates with in mass-storage and DFU modes.
pub mod usb_id {
    pub const VENDOR_ID: u16 = 0x0483;
    pub const PRODUCT_ID: u16 = 0x3744;
}

/// FPEC (Flash Program/Erase Controller) register block, base
/// `0x4002_2000`, and the bit layout of its `SR`/`CR` registers.
pub mod fpec {
    pub const BASE: u32 = 0x4002_2000;
    pub const ACR: u32 = BASE;
    pub const KEYR: u32 = BASE + 0x04;
    pub const SR: u32 = BASE + 0x0C;
    pub const CR: u32 = BASE + 0x10;
    pub const AR: u32 = BASE + 0x14;
    pub const OBR: u32 = BASE + 0x1C;
    pub const WRPR: u32 = BASE + 0x20;

    /// First of the two magic values written to [`KEYR`] to unlock the
    /// controller.
    pub const KEY1: u32 = 0x4567_0123;
    /// Second unlock key.
    pub const KEY2: u32 = 0xCDEF_89AB;

    /// `SR` bit: operation in progress.
    pub const SR_BSY: u32 = 1 << 0;
    /// `SR` bit: end of operation (write 1 to clear).
    pub const SR_EOP: u32 = 1 << 5;

    /// `CR` bit: page programming enable.
    pub const CR_PG: u32 = 1 << 0;
    /// `CR` bit: page erase enable.
    pub const CR_PER: u32 = 1 << 1;
    /// `CR` bit: mass erase enable.
    pub const CR_MER: u32 = 1 << 2;
    /// `CR` bit: start the erase selected by `PER`/`MER`.
    pub const CR_STRT: u32 = 1 << 6;
    /// `CR` bit: controller is locked (read-only, set by hardware).
    pub const CR_LOCK: u32 = 1 << 7;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_file_parses_all_21_words_in_order() {
        let mut buf = [0u8; crate::opcode::ALL_REGS_LEN];
        for (i, chunk) in buf.chunks_mut(4).enumerate() {
            crate::codec::write_u32_le(chunk, 0, i as u32);
        }
        let regs = RegisterFile::from_wire(&buf).unwrap();
        assert_eq!(regs.r[0], 0);
        assert_eq!(regs.r[15], 15);
        assert_eq!(regs.xpsr, 16);
        assert_eq!(regs.main_sp, 17);
        assert_eq!(regs.process_sp, 18);
        assert_eq!(regs.rw, 19);
        assert_eq!(regs.rw2, 20);
        assert_eq!(regs.pc(), 15);
        assert_eq!(regs.sp(), regs.r[13]);
    }

    #[test]
    fn register_file_rejects_a_reply_shorter_than_84_bytes() {
        let buf = [0u8; crate::opcode::ALL_REGS_LEN - 1];
        let err = RegisterFile::from_wire(&buf).unwrap_err();
        assert_eq!(
            err,
            crate::error::ProtoError::ReplyTooShort {
                expected: crate::opcode::ALL_REGS_LEN,
                actual: crate::opcode::ALL_REGS_LEN - 1,
            }
        );
    }

    #[test]
    fn adapter_mode_decodes_known_bytes() {
        assert_eq!(AdapterMode::from_wire(0x00), AdapterMode::Dfu);
        assert_eq!(AdapterMode::from_wire(0x01), AdapterMode::Mass);
        assert_eq!(
            AdapterMode::from_wire(0x02),
            AdapterMode::Debug(DebugInterface::Swd)
        );
        assert_eq!(AdapterMode::from_wire(0x7F), AdapterMode::Unknown(0x7F));
    }

    #[test]
    fn adapter_version_unpacks_the_nibble_fields() {
        // stlink_v=2, jtag_v=21, swim_v=7, vid=0x0483, pid=0x3744
        let b0 = (2u8 << 4) | (21u8 >> 2);
        let b1 = ((21u8 & 0x3) << 6) | 7u8;
        let buf = [b0, b1, 0x83, 0x04, 0x44, 0x37];
        let v = AdapterVersion::from_wire(&buf);
        assert_eq!(v.stlink_v, 2);
        assert_eq!(v.jtag_v, 21);
        assert_eq!(v.swim_v, 7);
        assert_eq!(v.vendor_id, 0x0483);
        assert_eq!(v.product_id, 0x3744);
    }

    #[test]
    fn core_status_decodes_known_bytes() {
        assert_eq!(CoreStatus::from_wire(0x80), CoreStatus::Running);
        assert_eq!(CoreStatus::from_wire(0x81), CoreStatus::Halted);
        assert_eq!(CoreStatus::from_wire(0x01), CoreStatus::Unknown(0x01));
    }
}

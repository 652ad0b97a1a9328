//! The adapter session: owns the transport, tracks last-known mode/status,
//! and provides the typed command layer on top of raw CDBs.

use std::time::{Duration, Instant};

use stlink_proto::model::memory_map;
use stlink_proto::opcode::{self, CDB_LEN};
use stlink_proto::{AdapterMode, AdapterVersion, CoreStatus, RegisterFile};

use crate::error::{LinkError, Result};
use crate::transport::Transport;

/// Minimum size of the scratch buffer every session carries for I/O.
pub const MIN_SCRATCH_LEN: usize = 100 * 1024;

/// Default per-CDB transport timeout.
pub const DEFAULT_CDB_TIMEOUT_MS: u32 = 1_000;

/// Default deadline for polling loops that wait on the core (e.g.
/// `run_at`, wait-for-halt).
pub const DEFAULT_POLL_DEADLINE_MS: u64 = 30_000;

/// Interval between poll iterations.
pub const POLL_INTERVAL_MS: u64 = 10;

/// The F10x medium-density memory map a session assumes for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMap {
    pub flash_base: u32,
    pub flash_size: u32,
    pub flash_page_size: u32,
    pub sram_base: u32,
    pub sram_size: u32,
    pub system_base: u32,
    pub system_size: u32,
}

impl Default for MemoryMap {
    fn default() -> Self {
        MemoryMap {
            flash_base: memory_map::FLASH_BASE,
            flash_size: memory_map::FLASH_SIZE,
            flash_page_size: memory_map::FLASH_PAGE_SIZE,
            sram_base: memory_map::SRAM_BASE,
            sram_size: memory_map::SRAM_SIZE,
            system_base: memory_map::SYSTEM_BASE,
            system_size: memory_map::SYSTEM_SIZE,
        }
    }
}

/// An open connection to an ST-Link v1 adapter, plus everything learned
/// about it and its target so far.
pub struct Session<T: Transport> {
    transport: T,
    verbosity: u8,
    timeout_ms: u32,
    last_error: Option<String>,
    scratch: Vec<u8>,
    mode: Option<AdapterMode>,
    status: Option<CoreStatus>,
    version: Option<AdapterVersion>,
    core_id: Option<u32>,
    memory_map: MemoryMap,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, verbosity: u8) -> Self {
        Session {
            transport,
            verbosity,
            timeout_ms: DEFAULT_CDB_TIMEOUT_MS,
            last_error: None,
            scratch: vec![0u8; MIN_SCRATCH_LEN],
            mode: None,
            status: None,
            version: None,
            core_id: None,
            memory_map: MemoryMap::default(),
        }
    }

    /// Override the per-CDB transport timeout (default
    /// [`DEFAULT_CDB_TIMEOUT_MS`]).
    pub fn set_timeout_ms(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// The formatted text of the most recent command failure, if any.
    /// `LinkError` itself isn't `Clone` (it wraps `std::io::Error`), so the
    /// session keeps the rendered message rather than the typed error.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn mode(&self) -> Option<AdapterMode> {
        self.mode
    }

    pub fn status(&self) -> Option<CoreStatus> {
        self.status
    }

    pub fn core_id(&self) -> Option<u32> {
        self.core_id
    }

    /// Firmware/VID/PID identity discovered by the last [`Session::get_version`].
    pub fn version(&self) -> Option<AdapterVersion> {
        self.version
    }

    pub fn memory_map(&self) -> MemoryMap {
        self.memory_map
    }

    /// Scratch space owned by the session, at least [`MIN_SCRATCH_LEN`]
    /// bytes. Never aliased with a caller-supplied buffer.
    pub fn scratch_mut(&mut self) -> &mut [u8] {
        &mut self.scratch
    }

    /// The underlying transport, exposed for test doubles that need to
    /// inspect recorded calls.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn record<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(ref e) = result {
            log::debug!("stlink-link: command failed: {e}");
            self.last_error = Some(e.to_string());
        }
        result
    }

    fn exec_none(&mut self, cdb: &[u8; CDB_LEN]) -> Result<()> {
        let timeout_ms = self.timeout_ms;
        let res = self
            .transport
            .execute_none(cdb, timeout_ms)
            .map(|_| ())
            .map_err(LinkError::from);
        self.record(res)
    }

    fn exec_read(&mut self, cdb: &[u8; CDB_LEN], len: usize) -> Result<Vec<u8>> {
        let timeout_ms = self.timeout_ms;
        let mut buf = vec![0u8; len];
        let res = self
            .transport
            .execute_read(cdb, &mut buf, timeout_ms)
            .map(|_| buf)
            .map_err(LinkError::from);
        self.record(res)
    }

    fn exec_write(&mut self, cdb: &[u8; CDB_LEN], data: &[u8]) -> Result<()> {
        let timeout_ms = self.timeout_ms;
        let res = self
            .transport
            .execute_write(cdb, data, timeout_ms)
            .map(|_| ())
            .map_err(LinkError::from);
        self.record(res)
    }

    /// `GET_VERSION`.
    pub fn get_version(&mut self) -> Result<AdapterVersion> {
        let cdb = stlink_proto::cdb::get_version();
        let buf = self.exec_read(&cdb, AdapterVersion::WIRE_LEN)?;
        let array: [u8; AdapterVersion::WIRE_LEN] = buf
            .try_into()
            .map_err(|_| LinkError::UnexpectedReplyLength {
                expected: AdapterVersion::WIRE_LEN,
                actual: AdapterVersion::WIRE_LEN,
            })?;
        let version = AdapterVersion::from_wire(&array);
        self.version = Some(version);
        Ok(version)
    }

    /// `GET_CURRENT_MODE`.
    pub fn get_current_mode(&mut self) -> Result<AdapterMode> {
        let cdb = stlink_proto::cdb::get_current_mode();
        let buf = self.exec_read(&cdb, 2)?;
        let mode = AdapterMode::from_wire(buf[0]);
        self.mode = Some(mode);
        Ok(mode)
    }

    /// DFU `EXIT`.
    pub fn dfu_exit(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::dfu_exit();
        self.exec_none(&cdb)
    }

    /// Debug `ENTER` + `ENTER_SWD`, followed by the mandatory first
    /// `READ_CORE_ID` the adapter requires before accepting any other
    /// debug command.
    pub fn enter_swd(&mut self) -> Result<u32> {
        let cdb = stlink_proto::cdb::enter_swd();
        self.exec_none(&cdb)?;
        self.mode = Some(AdapterMode::Debug(stlink_proto::DebugInterface::Swd));
        self.read_core_id()
    }

    /// Debug `ENTER` + `ENTER_JTAG`.
    pub fn enter_jtag(&mut self) -> Result<u32> {
        let cdb = stlink_proto::cdb::enter_jtag();
        self.exec_none(&cdb)?;
        self.mode = Some(AdapterMode::Debug(stlink_proto::DebugInterface::Jtag));
        self.read_core_id()
    }

    /// Debug `EXIT`, back to mass-storage mode.
    pub fn exit_debug(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::exit_debug();
        self.exec_none(&cdb)?;
        self.mode = Some(AdapterMode::Mass);
        Ok(())
    }

    /// `READ_CORE_ID`, validated against the expected Cortex-M3 id. A
    /// mismatch is logged but not fatal; callers decide whether to treat it
    /// as an error (see spec §7 `UnexpectedCoreId`).
    pub fn read_core_id(&mut self) -> Result<u32> {
        let cdb = stlink_proto::cdb::read_core_id();
        let buf = self.exec_read(&cdb, 4)?;
        let id = stlink_proto::codec::read_u32_le(&buf, 0);
        if id != stlink_proto::CORTEX_M3_CORE_ID {
            log::warn!(
                "stlink-link: core id {:#010x} does not match the expected {:#010x}",
                id,
                stlink_proto::CORTEX_M3_CORE_ID
            );
        }
        self.core_id = Some(id);
        Ok(id)
    }

    /// `GET_STATUS`.
    pub fn get_status(&mut self) -> Result<CoreStatus> {
        let cdb = stlink_proto::cdb::get_status();
        let buf = self.exec_read(&cdb, 2)?;
        let status = CoreStatus::from_wire(buf[0]);
        self.status = Some(status);
        Ok(status)
    }

    /// `FORCE_DEBUG`: halt the core into debug state.
    pub fn force_debug(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::force_debug();
        self.exec_none(&cdb)?;
        self.status = Some(CoreStatus::Halted);
        Ok(())
    }

    /// `RESET_SYS`: system reset, core left halted.
    pub fn reset_sys(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::reset_sys();
        self.exec_none(&cdb)?;
        self.status = Some(CoreStatus::Halted);
        Ok(())
    }

    /// Reject register/loader operations unless the core is known to be
    /// halted (spec.md §3).
    fn require_halted(&self) -> Result<()> {
        if self.status != Some(CoreStatus::Halted) {
            return Err(LinkError::ModeError {
                actual: self.status,
            });
        }
        Ok(())
    }

    /// `READ_ALL_REGS`.
    pub fn read_all_regs(&mut self) -> Result<RegisterFile> {
        self.require_halted()?;
        let cdb = stlink_proto::cdb::read_all_regs();
        let buf = self.exec_read(&cdb, opcode::ALL_REGS_LEN)?;
        Ok(RegisterFile::from_wire(&buf)?)
    }

    /// `READ_REG`; `index` must be `< NUM_REGS`.
    pub fn read_reg(&mut self, index: u8) -> Result<u32> {
        if index as usize >= opcode::NUM_REGS {
            return Err(LinkError::InvalidRegisterIndex(index));
        }
        self.require_halted()?;
        let cdb = stlink_proto::cdb::read_reg(index);
        let buf = self.exec_read(&cdb, 4)?;
        Ok(stlink_proto::codec::read_u32_le(&buf, 0))
    }

    /// `WRITE_REG`; `index` must be `< NUM_REGS`.
    pub fn write_reg(&mut self, index: u8, value: u32) -> Result<()> {
        if index as usize >= opcode::NUM_REGS {
            return Err(LinkError::InvalidRegisterIndex(index));
        }
        self.require_halted()?;
        let cdb = stlink_proto::cdb::write_reg(index, value);
        self.exec_none(&cdb)
    }

    /// `READ_MEM_32BIT`; `len` must be the caller's already-validated,
    /// 4-byte-aligned transfer length.
    pub fn read_mem_32bit(&mut self, addr: u32, len: u16) -> Result<Vec<u8>> {
        let cdb = stlink_proto::cdb::read_mem_32bit(addr, len);
        self.exec_read(&cdb, len as usize)
    }

    /// `WRITE_MEM_32BIT`.
    pub fn write_mem_32bit(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let cdb = stlink_proto::cdb::write_mem_32bit(addr, data.len() as u16);
        self.exec_write(&cdb, data)
    }

    /// `WRITE_MEM_8BIT`.
    pub fn write_mem_8bit(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let cdb = stlink_proto::cdb::write_mem_8bit(addr, data.len() as u16);
        self.exec_write(&cdb, data)
    }

    /// `RUN_CORE`.
    pub fn run_core(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::run_core();
        self.exec_none(&cdb)?;
        self.status = Some(CoreStatus::Running);
        Ok(())
    }

    /// `STEP_CORE`.
    pub fn step_core(&mut self) -> Result<()> {
        let cdb = stlink_proto::cdb::step_core();
        self.exec_none(&cdb)?;
        self.status = Some(CoreStatus::Halted);
        Ok(())
    }

    /// `SET_FP`: arm a fixed breakpoint at `addr`.
    pub fn set_fp(&mut self, addr: u32) -> Result<()> {
        let cdb = stlink_proto::cdb::set_fp(addr);
        self.exec_none(&cdb)
    }

    /// `CLEAR_FP`.
    pub fn clear_fp(&mut self, addr: u32) -> Result<()> {
        let cdb = stlink_proto::cdb::clear_fp(addr);
        self.exec_none(&cdb)
    }

    /// `WRITE_DEBUG_REG`: write a single 32-bit debug/peripheral register.
    pub fn write_debug_reg(&mut self, addr: u32, value: u32) -> Result<()> {
        let cdb = stlink_proto::cdb::write_debug_reg(addr, value);
        self.exec_none(&cdb)
    }

    /// Poll [`Session::get_status`] until the core reports
    /// [`CoreStatus::Halted`] or `deadline` elapses.
    pub fn wait_halted(&mut self, deadline: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.get_status()? == CoreStatus::Halted {
                return Ok(());
            }
            if start.elapsed() >= deadline {
                return Err(LinkError::CoreNeverHalted(deadline.as_millis() as u64));
            }
            std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, Reply};

    fn session_with(replies: Vec<Reply>) -> Session<MockTransport> {
        let mut transport = MockTransport::default();
        for reply in replies {
            transport.push_reply(reply);
        }
        Session::new(transport, 0)
    }

    #[test]
    fn new_session_carries_at_least_the_minimum_scratch_buffer() {
        let mut session = session_with(vec![]);
        assert!(session.scratch_mut().len() >= MIN_SCRATCH_LEN);
    }

    #[test]
    fn enter_swd_reads_the_core_id_right_after_entering() {
        let core_id_bytes = stlink_proto::CORTEX_M3_CORE_ID.to_le_bytes().to_vec();
        let mut session = session_with(vec![Reply::None, Reply::Read(core_id_bytes)]);
        let id = session.enter_swd().unwrap();
        assert_eq!(id, stlink_proto::CORTEX_M3_CORE_ID);
        assert_eq!(
            session.mode(),
            Some(AdapterMode::Debug(stlink_proto::DebugInterface::Swd))
        );
        assert_eq!(session.transport_mut().calls.len(), 2);
        let (enter_cdb, _) = &session.transport_mut().calls[0];
        assert_eq!(enter_cdb[0], opcode::class::DEBUG_COMMAND);
        assert_eq!(enter_cdb[1], opcode::debug::ENTER);
        assert_eq!(enter_cdb[2], opcode::debug::ENTER_SWD);
    }

    #[test]
    fn read_reg_rejects_out_of_range_index() {
        let mut session = session_with(vec![]);
        let err = session.read_reg(opcode::NUM_REGS as u8).unwrap_err();
        assert!(matches!(err, LinkError::InvalidRegisterIndex(_)));
        assert!(session.transport_mut().calls.is_empty());
    }

    #[test]
    fn read_all_regs_parses_the_84_byte_reply() {
        let mut buf = vec![0u8; opcode::ALL_REGS_LEN];
        stlink_proto::codec::write_u32_le(&mut buf, 60, 0x0800_1234); // pc, word 15
        let mut session = session_with(vec![Reply::None, Reply::Read(buf)]);
        session.force_debug().unwrap();
        let regs = session.read_all_regs().unwrap();
        assert_eq!(regs.pc(), 0x0800_1234);
    }

    #[test]
    fn register_ops_are_rejected_while_the_core_is_not_known_halted() {
        let mut session = session_with(vec![]);
        let err = session.write_reg(0, 0x1234).unwrap_err();
        assert!(matches!(err, LinkError::ModeError { actual: None }));
        assert!(session.transport_mut().calls.is_empty());
    }

    #[test]
    fn register_ops_proceed_once_the_core_is_halted() {
        let mut session = session_with(vec![Reply::None, Reply::None]);
        session.force_debug().unwrap();
        session.write_reg(0, 0x1234).unwrap();
    }

    #[test]
    fn wait_halted_returns_once_status_reports_halted() {
        let mut session = session_with(vec![
            Reply::Read(vec![opcode::status::OK, 0]),
            Reply::Read(vec![opcode::status::FALSE, 0]),
        ]);
        session.wait_halted(Duration::from_millis(500)).unwrap();
        assert_eq!(session.status(), Some(CoreStatus::Halted));
    }
}

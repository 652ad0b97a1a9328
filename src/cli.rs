//! CLI argument parsing for the `stlinkv1` driver.
//!
//! Mirrors the teacher's `clap`-derive layout: a global verbosity flag, a
//! positional device-node path, and a subcommand tree. The distilled spec
//! treats this surface as an external collaborator; here it is the ambient
//! CLI layer the workspace always ships with one subcommand per high-level
//! operation in `crate::ops`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stlinkv1")]
#[command(author, version, about = "ST-Link v1 host driver for STM32F10x", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Per-CDB transport timeout, in milliseconds
    #[arg(long, default_value_t = stlink_link::DEFAULT_CDB_TIMEOUT_MS, global = true)]
    pub timeout_ms: u32,

    /// Generic SCSI device node (e.g. /dev/sg0)
    pub device: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open, mode-switch to SWD, and verify the core id
    Identify,

    /// Report flash size, unique id, and DBGMCU id
    Info,

    /// Dump all 21 core registers
    Regs,

    /// Report whether the core is running or halted
    Status,

    /// Resume execution from its current PC
    Run,

    /// Set PC to `addr` and resume, waiting for the core to halt
    RunAt {
        /// Target address (accepts 0x-prefixed hex)
        #[arg(value_parser = parse_u32)]
        addr: u32,
    },

    /// Toggle the Discovery board's onboard LEDs
    Blink,

    /// Program one half-word directly, bypassing the SRAM loader
    WriteDemo {
        /// Target flash address (accepts 0x-prefixed hex)
        #[arg(value_parser = parse_u32, default_value = "0x08000ba0")]
        addr: u32,
        /// Half-word value to write (accepts 0x-prefixed hex)
        #[arg(value_parser = parse_u16, default_value = "0xdbec")]
        value: u16,
    },

    /// Flash programming operations
    #[command(subcommand)]
    Flash(FlashCommands),

    /// SRAM load operations
    #[command(subcommand)]
    Sram(SramCommands),
}

#[derive(Subcommand)]
pub enum FlashCommands {
    /// Erase, program, and verify a file into flash
    Write {
        path: PathBuf,
        #[arg(long, value_parser = parse_u32, default_value = "0x08000000")]
        addr: u32,
        /// Skip the read-back verification pass
        #[arg(long)]
        no_verify: bool,
    },

    /// Read flash (or any mapped memory) to a file
    Read {
        path: PathBuf,
        #[arg(long, value_parser = parse_u32, default_value = "0x08000000")]
        addr: u32,
        #[arg(long)]
        size: u32,
    },

    /// Compare a file against device flash contents
    Check {
        path: PathBuf,
        #[arg(long, value_parser = parse_u32, default_value = "0x08000000")]
        addr: u32,
    },
}

#[derive(Subcommand)]
pub enum SramCommands {
    /// Load a file into SRAM and verify it
    Write {
        path: PathBuf,
        #[arg(long, value_parser = parse_u32, default_value = "0x20000000")]
        addr: u32,
    },
}

fn parse_u32(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn parse_u16(s: &str) -> Result<u16, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

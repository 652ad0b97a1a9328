//! stlinkv1 - host-side ST-Link v1 programmer/debugger driver for STM32F10x
//!
//! Mode-switches the adapter, halts/runs/steps the Cortex-M3 core, reads
//! and writes its registers and memory, and programs on-chip flash by
//! injecting a small Thumb loader into SRAM and executing it under
//! debugger supervision.

mod cli;
mod ops;

use clap::Parser;
use cli::{Cli, Commands, FlashCommands, SramCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => {}
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let device = cli.device.clone();
    let device = device.as_path();
    let verbosity = cli.verbose;
    let timeout_ms = cli.timeout_ms;

    let result = match cli.command {
        Commands::Identify => ops::identify::identify(device, verbosity, timeout_ms),
        Commands::Info => ops::info::info(device, verbosity, timeout_ms),
        Commands::Regs => ops::regs::regs(device, verbosity, timeout_ms),
        Commands::Status => ops::status::status(device, verbosity, timeout_ms),
        Commands::Run => ops::run::run(device, verbosity, timeout_ms),
        Commands::RunAt { addr } => ops::run::run_at(device, verbosity, timeout_ms, addr),
        Commands::Blink => ops::blink::blink(device, verbosity, timeout_ms),
        Commands::WriteDemo { addr, value } => {
            ops::write_demo::write_demo(device, verbosity, timeout_ms, addr, value)
        }
        Commands::Flash(FlashCommands::Write {
            path,
            addr,
            no_verify,
        }) => ops::flash::write(device, verbosity, timeout_ms, &path, addr, no_verify),
        Commands::Flash(FlashCommands::Read { path, addr, size }) => {
            ops::flash::read(device, verbosity, timeout_ms, &path, addr, size)
        }
        Commands::Flash(FlashCommands::Check { path, addr }) => {
            ops::flash::check(device, verbosity, timeout_ms, &path, addr)
        }
        Commands::Sram(SramCommands::Write { path, addr }) => {
            ops::sram::write(device, verbosity, timeout_ms, &path, addr)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

mod cli;
mod config;
mod exec;
mod progress;
mod serial;
mod session;

use anyhow::{Result, anyhow};
use clap::Parser;
use kodeos_loader_lib::FlashOperation;
use std::process;

use crate::cli::{Cli, Commands, merge_config};
use crate::config::LoaderConfig;
use crate::session::Session;

fn main() {
    // Initialize tracing, set log level from environment variable
    // Log level can be controlled by setting the RUST_LOG environment variable, e.g.:
    // RUST_LOG=debug, RUST_LOG=kodeos_loader_lib=trace, RUST_LOG=info
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let config = LoaderConfig::from_file(path)?;
            config
                .validate()
                .map_err(|e| anyhow!("Invalid config file '{}': {}", path, e))?;
            Some(config)
        }
        None => None,
    };
    let settings = merge_config(&args, config)?;

    match args.command.clone().unwrap_or(Commands::Shell) {
        Commands::Ports => {
            serial::print_ports(&settings.filter, settings.language);
            Ok(())
        }
        Commands::Flash(params) => {
            let operation = if params.app {
                FlashOperation::AppFlash
            } else {
                FlashOperation::StandardFlash
            };
            exec::execute(&settings, operation, Some(params.firmware), false)
        }
        Commands::Erase(params) => {
            exec::execute(&settings, FlashOperation::Erase, None, params.yes)
        }
        Commands::Shell => Session::new(settings).run(),
    }
}

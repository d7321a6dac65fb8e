use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use kodeos_loader_lib::{Language, PortFilter, ToolSettings};
use std::path::PathBuf;

use crate::config::LoaderConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "kodeOS Loader: flash ESP32-S3 builds with esptool", long_about = None)]
pub struct Cli {
    /// JSON configuration file path
    #[arg(long = "config", short = 'f')]
    pub config: Option<String>,

    /// Serial port device (default: first detected USB port)
    #[arg(short = 'p', long = "port")]
    pub port: Option<String>,

    /// Serial port baud rate used by esptool (default: 460800)
    #[arg(short = 'b', long = "baud")]
    pub baud: Option<u32>,

    /// Target chip passed to esptool (default: esp32s3)
    #[arg(short = 'c', long = "chip")]
    pub chip: Option<String>,

    /// Flashing tool program (default: esptool)
    #[arg(long = "tool")]
    pub tool: Option<String>,

    /// Interface language
    #[arg(short = 'l', long = "lang", value_enum)]
    pub lang: Option<Language>,

    /// List every serial port, not only USB ones
    #[arg(long = "all-ports")]
    pub all_ports: bool,

    /// Suppress progress bar output (default: false)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List candidate serial ports
    #[command(name = "ports")]
    Ports,

    /// Write a firmware image (at 0x0, or at 0x400000 with --app)
    #[command(name = "flash")]
    Flash(FlashArgs),

    /// Erase the entire flash
    #[command(name = "erase")]
    Erase(EraseArgs),

    /// Interactive loader session (default)
    #[command(name = "shell")]
    Shell,
}

#[derive(Parser, Debug, Clone)]
pub struct FlashArgs {
    /// Firmware .bin file
    #[arg(required = true)]
    pub firmware: PathBuf,

    /// Flash the kodeOS app partition (0x400000, 80 MHz, DIO, 32MB)
    #[arg(long = "app")]
    pub app: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EraseArgs {
    /// Do not ask for confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

/// Effective settings after merging CLI arguments over the configuration file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tool: ToolSettings,
    pub language: Language,
    pub port: Option<String>,
    pub filter: PortFilter,
    pub quiet: bool,
}

/// Merge CLI arguments with configuration file, CLI args take precedence
pub fn merge_config(args: &Cli, config: Option<LoaderConfig>) -> Result<Settings> {
    let base_config = config.unwrap_or_else(LoaderConfig::with_defaults);

    let language = match args.lang {
        Some(lang) => lang,
        None => base_config
            .parse_language()
            .map_err(|e| anyhow!("Invalid language in config: {}", e))?,
    };

    let usb_ids = base_config
        .usb_ids()
        .map_err(|e| anyhow!("Invalid port filter in config: {}", e))?;

    let tool = ToolSettings {
        program: args.tool.clone().unwrap_or_else(|| base_config.tool.clone()),
        prefix_args: if args.tool.is_some() {
            Vec::new()
        } else {
            base_config.tool_args.clone()
        },
        chip: args.chip.clone().unwrap_or_else(|| base_config.chip.clone()),
        baud: args.baud.unwrap_or(base_config.baud),
    };

    Ok(Settings {
        tool,
        language,
        port: args.port.clone().or_else(|| base_config.port.clone()),
        filter: PortFilter {
            usb_only: base_config.usb_only && !args.all_ports,
            usb_ids: if args.all_ports { Vec::new() } else { usb_ids },
        },
        quiet: args.quiet || base_config.quiet,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let args = Cli::parse_from(["kodeos-loader", "-p", "COM7", "-b", "115200", "-l", "es"]);
        let mut config = LoaderConfig::with_defaults();
        config.port = Some("/dev/ttyACM0".to_string());
        config.tool = "python3".to_string();
        config.tool_args = vec!["-m".to_string(), "esptool".to_string()];

        let settings = merge_config(&args, Some(config)).unwrap();
        assert_eq!(settings.port.as_deref(), Some("COM7"));
        assert_eq!(settings.tool.baud, 115200);
        assert_eq!(settings.tool.program, "python3");
        assert_eq!(settings.tool.prefix_args, vec!["-m", "esptool"]);
        assert_eq!(settings.language, Language::Es);
        assert!(settings.filter.usb_only);
    }

    #[test]
    fn defaults_without_config() {
        let args = Cli::parse_from(["kodeos-loader", "--all-ports", "erase", "--yes"]);
        let settings = merge_config(&args, None).unwrap();
        assert_eq!(settings.tool, ToolSettings::default());
        assert_eq!(settings.language, Language::En);
        assert!(settings.port.is_none());
        assert!(!settings.filter.usb_only);
        assert!(matches!(args.command, Some(Commands::Erase(EraseArgs { yes: true }))));
    }

    #[test]
    fn flash_subcommand_parses() {
        let args = Cli::parse_from(["kodeos-loader", "flash", "build/kodeos.bin", "--app"]);
        match args.command {
            Some(Commands::Flash(flash)) => {
                assert!(flash.app);
                assert_eq!(flash.firmware, PathBuf::from("build/kodeos.bin"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

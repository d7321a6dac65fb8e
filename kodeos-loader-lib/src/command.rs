//! esptool invocation builder

use crate::error::{Error, Result};
use crate::ports::PortDescriptor;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};

/// Flash offset used for full images (bootloader + partition table + app).
pub const STANDARD_FLASH_ADDRESS: u32 = 0x0;
/// Flash offset of the kodeOS application partition.
pub const APP_FLASH_ADDRESS: u32 = 0x0040_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[strum(serialize_all = "snake_case")]
pub enum FlashOperation {
    /// Write a full image at 0x0
    StandardFlash,
    /// Write the kodeOS app partition at 0x400000
    AppFlash,
    /// Wipe the whole chip
    Erase,
}

impl FlashOperation {
    /// Flash operations need a firmware file, erase does not.
    pub fn needs_firmware(self) -> bool {
        !matches!(self, FlashOperation::Erase)
    }

    pub fn address(self) -> Option<u32> {
        match self {
            FlashOperation::StandardFlash => Some(STANDARD_FLASH_ADDRESS),
            FlashOperation::AppFlash => Some(APP_FLASH_ADDRESS),
            FlashOperation::Erase => None,
        }
    }
}

/// How the external flashing tool is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Program to execute, looked up in `PATH`.
    pub program: String,
    /// Arguments placed before everything else (e.g. `-m esptool` for python).
    pub prefix_args: Vec<String>,
    pub chip: String,
    pub baud: u32,
}

impl ToolSettings {
    pub const DEFAULT_PROGRAM: &'static str = "esptool";
    pub const DEFAULT_CHIP: &'static str = "esp32s3";
    pub const DEFAULT_BAUD: u32 = 460800;
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: Self::DEFAULT_PROGRAM.to_string(),
            prefix_args: Vec::new(),
            chip: Self::DEFAULT_CHIP.to_string(),
            baud: Self::DEFAULT_BAUD,
        }
    }
}

/// User supplied inputs for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashParameters {
    pub port: Option<PortDescriptor>,
    pub firmware: Option<PathBuf>,
}

impl FlashParameters {
    pub fn new(port: PortDescriptor, firmware: Option<PathBuf>) -> Self {
        Self {
            port: Some(port),
            firmware,
        }
    }
}

/// A fully formed external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn contains_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Checks that `path` names an existing regular file.
pub fn validate_firmware(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_parameters("no firmware file selected"));
    }
    match path.metadata() {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(Error::invalid_parameters(format!(
            "'{}' is not a file",
            path.display()
        ))),
        Err(e) => Err(Error::invalid_parameters(format!(
            "cannot read firmware '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Maps an operation and its parameters to the tool command line.
///
/// The only filesystem access is the firmware existence check; nothing is spawned.
pub fn build_command(
    tool: &ToolSettings,
    operation: FlashOperation,
    params: &FlashParameters,
) -> Result<CommandInvocation> {
    let port = match &params.port {
        Some(port) if !port.name.trim().is_empty() => port,
        _ => return Err(Error::NoPortSelected),
    };

    let mut args = tool.prefix_args.clone();
    args.extend([
        "--chip".to_string(),
        tool.chip.clone(),
        "--port".to_string(),
        port.name.clone(),
        "--baud".to_string(),
        tool.baud.to_string(),
    ]);

    match operation {
        FlashOperation::Erase => args.push("erase_flash".to_string()),
        FlashOperation::StandardFlash | FlashOperation::AppFlash => {
            let firmware = params
                .firmware
                .as_deref()
                .ok_or_else(|| Error::invalid_parameters("no firmware file selected"))?;
            validate_firmware(firmware)?;

            args.push("write_flash".to_string());
            if operation == FlashOperation::AppFlash {
                args.extend(
                    ["--flash-freq", "80m", "--flash-mode", "dio", "--flash-size", "32MB"]
                        .map(String::from),
                );
            } else {
                args.push("-z".to_string());
            }
            if let Some(address) = operation.address() {
                args.push(format!("{:#x}", address));
            }
            args.push(firmware.to_string_lossy().into_owned());
        }
    }

    Ok(CommandInvocation {
        program: tool.program.clone(),
        args,
    })
}

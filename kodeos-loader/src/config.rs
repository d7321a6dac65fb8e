use anyhow::{Context, Result};
use kodeos_loader_lib::{Language, ToolSettings, UsbId};
use serde::{Deserialize, Serialize};

/// Default configuration values
pub struct Defaults;

impl Defaults {
    pub const TOOL: &'static str = ToolSettings::DEFAULT_PROGRAM;
    pub const CHIP: &'static str = ToolSettings::DEFAULT_CHIP;
    pub const BAUD: u32 = ToolSettings::DEFAULT_BAUD;
    pub const LANGUAGE: &'static str = "en";
    pub const USB_ONLY: bool = true;
}

/// Hex string such as "0x303A"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexString(pub String);

impl HexString {
    pub fn to_u16(&self) -> Result<u16, String> {
        let Some(hex_part) = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
        else {
            return Err(format!("Invalid hex string format: {}", self.0));
        };

        u16::from_str_radix(hex_part, 16)
            .map_err(|e| format!("Failed to parse hex string '{}': {}", self.0, e))
    }
}

/// USB id accepted by the port filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortFilterConfig {
    pub vid: HexString,
    pub pid: Option<HexString>,
}

/// Root of the JSON configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default)]
    pub tool_args: Vec<String>,
    #[serde(default = "default_chip")]
    pub chip: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_usb_only")]
    pub usb_only: bool,
    #[serde(default)]
    pub port_filters: Vec<PortFilterConfig>,
    #[serde(default)]
    pub quiet: bool,
}

fn default_tool() -> String {
    Defaults::TOOL.to_string()
}
fn default_chip() -> String {
    Defaults::CHIP.to_string()
}
fn default_baud() -> u32 {
    Defaults::BAUD
}
fn default_language() -> String {
    Defaults::LANGUAGE.to_string()
}
fn default_usb_only() -> bool {
    Defaults::USB_ONLY
}

impl LoaderConfig {
    /// Loads the configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        let config: LoaderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path))?;
        Ok(config)
    }

    pub fn with_defaults() -> Self {
        Self {
            tool: Defaults::TOOL.to_string(),
            tool_args: Vec::new(),
            chip: Defaults::CHIP.to_string(),
            baud: Defaults::BAUD,
            language: Defaults::LANGUAGE.to_string(),
            port: None,
            usb_only: Defaults::USB_ONLY,
            port_filters: Vec::new(),
            quiet: false,
        }
    }

    pub fn parse_language(&self) -> Result<Language, String> {
        self.language
            .parse()
            .map_err(|_| format!("Invalid language: {}", self.language))
    }

    pub fn usb_ids(&self) -> Result<Vec<UsbId>, String> {
        self.port_filters
            .iter()
            .map(|filter| {
                let vid = filter
                    .vid
                    .to_u16()
                    .map_err(|e| format!("Invalid port filter vid: {}", e))?;
                let pid = match &filter.pid {
                    Some(pid) => Some(
                        pid.to_u16()
                            .map_err(|e| format!("Invalid port filter pid: {}", e))?,
                    ),
                    None => None,
                };
                Ok(UsbId { vid, pid })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tool.trim().is_empty() {
            return Err("Tool program must not be empty".to_string());
        }
        if self.chip.trim().is_empty() {
            return Err("Chip must not be empty".to_string());
        }
        if self.baud == 0 {
            return Err("Baud rate must be greater than zero".to_string());
        }
        self.parse_language()?;
        self.usb_ids()?;
        Ok(())
    }
}

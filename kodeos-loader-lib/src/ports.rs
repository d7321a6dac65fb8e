//! Serial port discovery
//!
//! Lists the serial devices currently attached to the host and keeps the ones
//! that look like an ESP32-S3 board (USB CDC / USB-UART bridges).

use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};
use std::fmt;
use tracing::{debug, warn};

/// A serial endpoint the user can pick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortDescriptor {
    /// Device path or identifier passed to the flashing tool (`/dev/ttyACM0`, `COM3`).
    pub name: String,
    /// Human readable description.
    pub label: String,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.label)
        }
    }
}

/// USB vendor/product pair accepted by a [`PortFilter`]. `pid: None` matches any product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub vid: u16,
    pub pid: Option<u16>,
}

impl UsbId {
    fn matches(&self, info: &UsbPortInfo) -> bool {
        self.vid == info.vid && self.pid.is_none_or(|pid| pid == info.pid)
    }
}

/// Which host serial ports count as candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortFilter {
    /// Only keep USB attached ports.
    pub usb_only: bool,
    /// When non-empty, USB ports must match one of these ids.
    pub usb_ids: Vec<UsbId>,
}

impl Default for PortFilter {
    fn default() -> Self {
        Self {
            usb_only: true,
            usb_ids: Vec::new(),
        }
    }
}

impl PortFilter {
    /// Converts a host port entry into a candidate, or `None` when it is filtered out.
    pub fn accept(&self, info: &SerialPortInfo) -> Option<PortDescriptor> {
        // Only accept /dev/cu.* values on macos, to avoid having two
        // copies of the port (both /dev/tty.* and /dev/cu.*)
        if cfg!(target_os = "macos") && info.port_name.starts_with("/dev/tty.") {
            return None;
        }

        match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                if !self.usb_ids.is_empty() && !self.usb_ids.iter().any(|id| id.matches(usb)) {
                    return None;
                }
                Some(PortDescriptor::new(&info.port_name, usb_label(usb)))
            }
            _ if !self.usb_ids.is_empty() => None,
            _ if self.usb_only && !info.port_name.to_uppercase().contains("USB") => None,
            SerialPortType::BluetoothPort => {
                Some(PortDescriptor::new(&info.port_name, "Bluetooth"))
            }
            _ => Some(PortDescriptor::new(&info.port_name, "")),
        }
    }

    /// Applies the filter to a host port list. The result is sorted by device name.
    pub fn apply(&self, ports: &[SerialPortInfo]) -> Vec<PortDescriptor> {
        let mut candidates: Vec<_> = ports.iter().filter_map(|p| self.accept(p)).collect();
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        candidates.dedup_by(|a, b| a.name == b.name);
        candidates
    }
}

fn usb_label(usb: &UsbPortInfo) -> String {
    let ids = format!("{:04X}:{:04X}", usb.vid, usb.pid);
    match usb.product.as_deref().or(usb.manufacturer.as_deref()) {
        Some(name) if !name.trim().is_empty() => format!("{} [{}]", name.trim(), ids),
        _ => format!("USB [{}]", ids),
    }
}

/// Lists candidate ports currently attached to the host.
///
/// A failure of the OS enumeration facility is logged and yields an empty list.
pub fn list_candidate_ports(filter: &PortFilter) -> Vec<PortDescriptor> {
    match serialport::available_ports() {
        Ok(ports) => {
            let candidates = filter.apply(&ports);
            debug!(
                "{} serial ports on host, {} candidates",
                ports.len(),
                candidates.len()
            );
            candidates
        }
        Err(e) => {
            warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

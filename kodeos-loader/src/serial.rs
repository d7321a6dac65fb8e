use anyhow::{Result, anyhow, bail};
use kodeos_loader_lib::i18n::{MessageKey, text};
use kodeos_loader_lib::{Language, PortDescriptor, PortFilter, list_candidate_ports};

/// Convert macOS /dev/tty.* ports to /dev/cu.* ports
///
/// On macOS, /dev/tty.* ports should be avoided in favor of /dev/cu.* ports
/// This function automatically converts any /dev/tty.* path to its /dev/cu.* equivalent
fn normalize_mac_port_name(port_name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        if port_name.starts_with("/dev/tty.") {
            return port_name.replace("/dev/tty.", "/dev/cu.");
        }
    }
    port_name.to_string()
}

pub fn normalize_port_name(port_name: &str) -> String {
    normalize_mac_port_name(port_name.trim())
}

/// Check if the specified serial port is available
///
/// Returns the port with its label when it is known to the host, otherwise an
/// error listing the ports that do exist.
pub fn check_port_available(port_name: &str) -> Result<PortDescriptor> {
    let ports = serialport::available_ports()
        .map_err(|e| anyhow!("Failed to get available ports list: {}", e))?;
    let all = PortFilter {
        usb_only: false,
        usb_ids: Vec::new(),
    }
    .apply(&ports);

    if let Some(port) = all.iter().find(|p| p.name == port_name) {
        return Ok(port.clone());
    }

    let available_ports: Vec<String> = all.iter().map(|p| p.name.clone()).collect();
    bail!(
        "The specified port '{}' does not exist. Available ports: {}",
        port_name,
        if available_ports.is_empty() {
            "No available ports".to_string()
        } else {
            available_ports.join(", ")
        }
    )
}

/// Picks the port to use: the requested one, or the first candidate.
pub fn resolve_port(requested: Option<&str>, filter: &PortFilter) -> Result<PortDescriptor> {
    match requested {
        Some(name) => check_port_available(&normalize_port_name(name)),
        None => list_candidate_ports(filter)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No USB ports found. Connect the board or use --port")),
    }
}

pub fn print_ports(filter: &PortFilter, language: Language) {
    let ports = list_candidate_ports(filter);
    if ports.is_empty() {
        println!("{}", text(language, MessageKey::NoPortsFound));
    }
    for port in ports {
        if port.label.is_empty() {
            println!("{}", port.name);
        } else {
            println!("{}\t{}", port.name, port.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_names_are_trimmed() {
        assert_eq!(normalize_port_name("  COM3 "), "COM3");
        assert_eq!(normalize_port_name("/dev/ttyACM0"), "/dev/ttyACM0");
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn mac_tty_becomes_cu() {
        assert_eq!(
            normalize_port_name("/dev/tty.usbmodem1101"),
            "/dev/cu.usbmodem1101"
        );
    }
}

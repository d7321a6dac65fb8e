use kodeos_loader_lib::{PortDescriptor, PortFilter, UsbId};
use serialport::{SerialPortInfo, SerialPortType, UsbPortInfo};

fn usb(name: &str, vid: u16, pid: u16, product: Option<&str>) -> SerialPortInfo {
    SerialPortInfo {
        port_name: name.to_string(),
        port_type: SerialPortType::UsbPort(UsbPortInfo {
            vid,
            pid,
            serial_number: None,
            manufacturer: Some("Espressif".to_string()),
            product: product.map(str::to_string),
            interface: None,
        }),
    }
}

fn plain(name: &str) -> SerialPortInfo {
    SerialPortInfo {
        port_name: name.to_string(),
        port_type: SerialPortType::Unknown,
    }
}

fn host_ports() -> Vec<SerialPortInfo> {
    vec![
        plain("/dev/ttyS0"),
        usb("/dev/ttyACM0", 0x303A, 0x1001, Some("USB JTAG/serial debug unit")),
        usb("/dev/cu.usbserial-10", 0x1A86, 0x7523, None),
        plain("/dev/ttyUSB3"),
        SerialPortInfo {
            port_name: "/dev/rfcomm0".to_string(),
            port_type: SerialPortType::BluetoothPort,
        },
    ]
}

fn names(ports: &[PortDescriptor]) -> Vec<&str> {
    ports.iter().map(|p| p.name.as_str()).collect()
}

#[test]
fn usb_only_keeps_usb_ports_sorted() {
    let ports = PortFilter::default().apply(&host_ports());
    assert_eq!(
        names(&ports),
        vec!["/dev/cu.usbserial-10", "/dev/ttyACM0", "/dev/ttyUSB3"]
    );
}

#[test]
fn labels_carry_product_and_ids() {
    let ports = PortFilter::default().apply(&host_ports());
    let acm = ports.iter().find(|p| p.name == "/dev/ttyACM0").unwrap();
    assert_eq!(acm.label, "USB JTAG/serial debug unit [303A:1001]");
    let ch340 = ports.iter().find(|p| p.name.contains("usbserial")).unwrap();
    assert_eq!(ch340.label, "Espressif [1A86:7523]");
    assert_eq!(
        acm.to_string(),
        "/dev/ttyACM0 (USB JTAG/serial debug unit [303A:1001])"
    );
}

#[test]
fn usb_ids_restrict_candidates() {
    let filter = PortFilter {
        usb_only: true,
        usb_ids: vec![UsbId {
            vid: 0x303A,
            pid: None,
        }],
    };
    assert_eq!(names(&filter.apply(&host_ports())), vec!["/dev/ttyACM0"]);

    let filter = PortFilter {
        usb_only: true,
        usb_ids: vec![UsbId {
            vid: 0x303A,
            pid: Some(0x4001),
        }],
    };
    assert!(filter.apply(&host_ports()).is_empty());
}

#[test]
fn all_ports_when_not_usb_only() {
    let filter = PortFilter {
        usb_only: false,
        usb_ids: Vec::new(),
    };
    let ports = filter.apply(&host_ports());
    assert_eq!(ports.len(), 5);
    assert!(ports.iter().any(|p| p.name == "/dev/ttyS0"));
}

#[test]
fn no_ports_gives_empty_list() {
    assert!(PortFilter::default().apply(&[]).is_empty());
}

use kodeos_loader_lib::command::{APP_FLASH_ADDRESS, validate_firmware};
use kodeos_loader_lib::{
    Error, FlashOperation, FlashParameters, PortDescriptor, ToolSettings, build_command,
};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn firmware() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0xE9, 0x03, 0x02, 0x20]).unwrap();
    file
}

fn port() -> PortDescriptor {
    PortDescriptor::new("P", "test port")
}

fn params(file: Option<PathBuf>) -> FlashParameters {
    FlashParameters::new(port(), file)
}

#[test]
fn standard_flash_writes_at_zero_without_app_flags() {
    let fw = firmware();
    let cmd = build_command(
        &ToolSettings::default(),
        FlashOperation::StandardFlash,
        &params(Some(fw.path().to_path_buf())),
    )
    .unwrap();

    assert_eq!(cmd.program, "esptool");
    assert!(cmd.contains_arg("0x0"));
    assert!(cmd.contains_arg("write_flash"));
    assert!(cmd.contains_arg("-z"));
    for flag in ["80m", "dio", "32MB", "0x400000"] {
        assert!(!cmd.contains_arg(flag), "unexpected {flag}");
    }

    let fw_arg = fw.path().to_string_lossy().into_owned();
    assert_eq!(cmd.args.last(), Some(&fw_arg));
    let addr = cmd.args.iter().position(|a| a == "0x0").unwrap();
    assert_eq!(addr, cmd.args.len() - 2);
}

#[test]
fn app_flash_writes_at_app_partition_with_fixed_flags() {
    let fw = firmware();
    let cmd = build_command(
        &ToolSettings::default(),
        FlashOperation::AppFlash,
        &params(Some(fw.path().to_path_buf())),
    )
    .unwrap();

    assert_eq!(APP_FLASH_ADDRESS, 0x400000);
    assert!(cmd.contains_arg("0x400000"));
    assert!(!cmd.contains_arg("0x0"));
    let joined = cmd.args.join(" ");
    assert!(joined.contains("--flash-freq 80m"));
    assert!(joined.contains("--flash-mode dio"));
    assert!(joined.contains("--flash-size 32MB"));
}

#[test]
fn erase_has_directive_and_no_file() {
    let cmd = build_command(
        &ToolSettings::default(),
        FlashOperation::Erase,
        &FlashParameters::new(port(), None),
    )
    .unwrap();

    assert_eq!(
        cmd.args,
        vec!["--chip", "esp32s3", "--port", "P", "--baud", "460800", "erase_flash"]
    );
}

#[test]
fn erase_ignores_a_missing_firmware() {
    let missing = PathBuf::from("/definitely/not/here.bin");
    let cmd = build_command(
        &ToolSettings::default(),
        FlashOperation::Erase,
        &params(Some(missing)),
    )
    .unwrap();
    assert!(!cmd.args.iter().any(|a| a.ends_with(".bin")));
}

#[test]
fn flash_without_firmware_is_invalid() {
    for op in [FlashOperation::StandardFlash, FlashOperation::AppFlash] {
        let err = build_command(&ToolSettings::default(), op, &params(None)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)), "{op}: {err}");

        let err = build_command(&ToolSettings::default(), op, &params(Some(PathBuf::new())))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)), "{op}: {err}");
    }
}

#[test]
fn flash_with_missing_file_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.bin");
    let err = build_command(
        &ToolSettings::default(),
        FlashOperation::StandardFlash,
        &params(Some(missing)),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));

    // a directory is not a firmware file either
    assert!(validate_firmware(dir.path()).is_err());
}

#[test]
fn no_port_is_rejected_for_every_operation() {
    let fw = firmware();
    let no_port = FlashParameters {
        port: None,
        firmware: Some(fw.path().to_path_buf()),
    };
    let blank_port = FlashParameters {
        port: Some(PortDescriptor::new("  ", "")),
        firmware: Some(fw.path().to_path_buf()),
    };
    for op in [
        FlashOperation::StandardFlash,
        FlashOperation::AppFlash,
        FlashOperation::Erase,
    ] {
        for p in [&no_port, &blank_port] {
            let err = build_command(&ToolSettings::default(), op, p).unwrap_err();
            assert!(matches!(err, Error::NoPortSelected));
        }
    }
}

#[test]
fn tool_settings_shape_the_prefix() {
    let tool = ToolSettings {
        program: "python3".to_string(),
        prefix_args: vec!["-m".to_string(), "esptool".to_string()],
        chip: "esp32s3".to_string(),
        baud: 921600,
    };
    let cmd = build_command(&tool, FlashOperation::Erase, &FlashParameters::new(port(), None))
        .unwrap();
    assert_eq!(cmd.program, "python3");
    assert_eq!(&cmd.args[..2], &["-m", "esptool"]);
    assert!(cmd.contains_arg("921600"));
    assert_eq!(
        cmd.to_string(),
        "python3 -m esptool --chip esp32s3 --port P --baud 921600 erase_flash"
    );
}

#[test]
fn operation_names_round_trip_through_strum() {
    assert_eq!(FlashOperation::AppFlash.to_string(), "app_flash");
    assert_eq!(
        "standard_flash".parse::<FlashOperation>().unwrap(),
        FlashOperation::StandardFlash
    );
    assert!(!FlashOperation::Erase.needs_firmware());
    assert_eq!(FlashOperation::Erase.address(), None);
}

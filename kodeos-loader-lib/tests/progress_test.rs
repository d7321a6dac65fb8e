use kodeos_loader_lib::progress::{ProgressTracker, parse_percent, strip_ansi};

#[test]
fn percent_markers_are_extracted() {
    assert_eq!(
        parse_percent("Writing at 0x00010000... (5 %)"),
        Some(5)
    );
    assert_eq!(parse_percent("Writing at 0x0004c000... (100%)"), Some(100));
    assert_eq!(parse_percent("( 42 % )"), Some(42));
    assert_eq!(parse_percent("Compressed 1048576 bytes to 654321..."), None);
    assert_eq!(parse_percent("bogus (250 %)"), None);
}

#[test]
fn tracker_reports_changes_only() {
    let mut tracker = ProgressTracker::new();
    assert_eq!(tracker.observe("Connecting...."), None);
    assert_eq!(tracker.observe("Writing at 0x0 (1 %)"), Some(1));
    assert_eq!(tracker.observe("Writing at 0x0 (1 %)"), None);
    assert_eq!(tracker.observe("Writing at 0x4000 (2 %)"), Some(2));
    assert_eq!(tracker.last(), Some(2));
}

#[test]
fn ansi_sequences_are_removed() {
    assert_eq!(strip_ansi("\x1b[1;31mA fatal error\x1b[0m"), "A fatal error");
    assert_eq!(strip_ansi("\x1b[2KHash of data verified."), "Hash of data verified.");
    assert_eq!(strip_ansi("plain"), "plain");
}

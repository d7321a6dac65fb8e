//! Progress reporting
//!
//! The flashing tool prints its progress as text (`Writing at 0x00010000... (12 %)`).
//! This module extracts the percentage from those lines and defines the callback
//! interface front-ends implement to display it (CLI bar, plain percentages, ...).

use regex::Regex;
use std::sync::{Arc, LazyLock};

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d{1,3})\s*%\s*\)").expect("valid percent regex"));

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("valid ansi regex")
});

/// Removes ANSI escape sequences (colors, cursor movement) from a line.
pub fn strip_ansi(line: &str) -> String {
    ANSI_RE.replace_all(line, "").into_owned()
}

/// Extracts a `(NN %)` progress marker. Values above 100 are ignored.
pub fn parse_percent(line: &str) -> Option<u8> {
    let caps = PERCENT_RE.captures(line)?;
    let value: u16 = caps.get(1)?.as_str().parse().ok()?;
    u8::try_from(value).ok().filter(|v| *v <= 100)
}

/// Tracks the last reported percentage of one run.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new percentage when `line` carries one different from the last seen.
    pub fn observe(&mut self, line: &str) -> Option<u8> {
        let percent = parse_percent(line)?;
        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

/// How a run's progress is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressType {
    /// No percentage available (erase)
    Spinner,
    /// Percentage driven bar
    Bar,
}

#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub progress_type: ProgressType,
    /// Short tag shown in front of the bar
    pub prefix: String,
    pub message: String,
}

/// Progress callback
///
/// Implement this to display the progress of one tool run.
pub trait ProgressCallback: Send + Sync {
    fn start(&self, info: ProgressInfo);

    fn update_message(&self, message: String);

    /// Sets the absolute percentage (0..=100). Ignored by spinners.
    fn set_percent(&self, percent: u8);

    fn finish(&self, final_message: String);

    /// Prints a tool output line without corrupting the progress display.
    fn log_line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Callback that produces no output.
#[derive(Debug, Default)]
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn start(&self, _info: ProgressInfo) {}

    fn update_message(&self, _message: String) {}

    fn set_percent(&self, _percent: u8) {}

    fn finish(&self, _final_message: String) {}
}

pub type ProgressCallbackArc = Arc<dyn ProgressCallback>;

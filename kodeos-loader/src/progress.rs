//! CLI progress display
//!
//! indicatif based progress bar for terminals, plain `NN%` lines otherwise.

use indicatif::{ProgressBar, ProgressStyle};
use kodeos_loader_lib::progress::{
    NoOpProgressCallback, ProgressCallback, ProgressCallbackArc, ProgressInfo, ProgressType,
};
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Prints the percentage on its own line each time it changes
pub struct PercentProgressCallback {
    last_percent: Mutex<Option<u8>>,
}

impl PercentProgressCallback {
    pub fn new() -> Self {
        Self {
            last_percent: Mutex::new(None),
        }
    }

    fn print_line(&self, line: &str) {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

impl ProgressCallback for PercentProgressCallback {
    fn start(&self, info: ProgressInfo) {
        if let Ok(mut last) = self.last_percent.lock() {
            *last = None;
        }
        if info.progress_type == ProgressType::Bar {
            self.print_line("0%");
        }
    }

    fn update_message(&self, _message: String) {}

    fn set_percent(&self, percent: u8) {
        let changed = match self.last_percent.lock() {
            Ok(mut last) if *last != Some(percent) => {
                *last = Some(percent);
                true
            }
            _ => false,
        };
        if changed {
            self.print_line(&format!("{}%", percent));
        }
    }

    fn finish(&self, final_message: String) {
        self.print_line(&final_message);
    }
}

/// indicatif backed progress callback
pub struct IndicatifProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgressCallback {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }
}

impl Default for IndicatifProgressCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for IndicatifProgressCallback {
    fn start(&self, info: ProgressInfo) {
        let bar = match info.progress_type {
            ProgressType::Spinner => {
                let spinner = ProgressBar::new_spinner();
                spinner.enable_steady_tick(Duration::from_millis(100));
                spinner.set_style(
                    ProgressStyle::with_template(&format!("[{}] {{spinner}} {{msg}}", info.prefix))
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                spinner
            }
            ProgressType::Bar => {
                let bar = ProgressBar::new(100);
                bar.set_style(
                    ProgressStyle::with_template(&format!(
                        "[{}] {{msg}} {{wide_bar}} {{pos}}%",
                        info.prefix
                    ))
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
                );
                bar
            }
        };
        bar.set_message(info.message);

        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn update_message(&self, message: String) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(message);
            }
        }
    }

    fn set_percent(&self, percent: u8) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_position(u64::from(percent));
            }
        }
    }

    fn finish(&self, final_message: String) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_with_message(final_message);
            }
        }
    }

    fn log_line(&self, line: &str) {
        let slot = self.bar.lock().ok();
        match slot.as_ref().and_then(|bar| bar.as_ref()) {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }
}

/// Picks the progress display for the current stdout
pub fn create_progress_callback(quiet: bool) -> ProgressCallbackArc {
    if quiet {
        Arc::new(NoOpProgressCallback)
    } else if io::stdout().is_terminal() {
        Arc::new(IndicatifProgressCallback::new())
    } else {
        Arc::new(PercentProgressCallback::new())
    }
}

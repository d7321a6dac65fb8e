use anyhow::{Context, Result, bail};
use kodeos_loader_lib::i18n::{self, MessageKey, text};
use kodeos_loader_lib::progress::{ProgressInfo, ProgressTracker, ProgressType, parse_percent};
use kodeos_loader_lib::{
    FlashOperation, FlashParameters, Language, ProcessRunner, RunEvent, build_command,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

use crate::cli::Settings;
use crate::progress::create_progress_callback;
use crate::serial;

/// Asks the erase confirmation on the terminal. Anything but yes aborts.
pub fn confirm_erase(language: Language) -> Result<bool> {
    println!("{}", text(language, MessageKey::EraseConfirmTitle));
    println!("{}", text(language, MessageKey::EraseConfirmMessage));
    print!("[y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(is_yes(&answer))
}

pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí" | "j" | "ja"
    )
}

/// Runs one operation to completion, streaming the tool output.
pub fn execute(
    settings: &Settings,
    operation: FlashOperation,
    firmware: Option<PathBuf>,
    assume_yes: bool,
) -> Result<()> {
    let lang = settings.language;
    let port = serial::resolve_port(settings.port.as_deref(), &settings.filter)?;
    debug!("Using port {}", port);

    let params = FlashParameters::new(port, firmware);
    // validate before asking anything
    let invocation = build_command(&settings.tool, operation, &params)
        .with_context(|| format!("Cannot {}", operation))?;

    if operation == FlashOperation::Erase && !assume_yes && !confirm_erase(lang)? {
        bail!("Erase aborted");
    }

    println!(
        "Executing {} with args: {:?}",
        invocation.program, invocation.args
    );

    let progress = create_progress_callback(settings.quiet);
    let (progress_type, message) = match operation {
        FlashOperation::Erase => (ProgressType::Spinner, MessageKey::StatusErasing),
        _ => (ProgressType::Bar, MessageKey::StatusStarting),
    };
    progress.start(ProgressInfo {
        progress_type,
        prefix: operation.to_string(),
        message: text(lang, message),
    });

    let handle = ProcessRunner::new()
        .run(&invocation)
        .context("Failed to start the flashing tool")?;

    let mut tracker = ProgressTracker::new();
    let mut result = None;
    for event in handle {
        match event {
            RunEvent::Line(line) => {
                if operation.needs_firmware() && !settings.quiet && parse_percent(&line).is_some()
                {
                    if let Some(percent) = tracker.observe(&line) {
                        progress.set_percent(percent);
                        progress.update_message(i18n::flashing_progress(lang, percent));
                    }
                } else {
                    progress.log_line(&line);
                }
            }
            RunEvent::Finished(finished) => result = Some(finished),
        }
    }

    let Some(result) = result else {
        bail!("Flashing tool output ended without an exit status");
    };

    let erase = operation == FlashOperation::Erase;
    let final_key = match (result.is_success(), erase) {
        (true, true) => MessageKey::EraseSuccess,
        (true, false) => MessageKey::FlashSuccess,
        (false, true) => MessageKey::EraseError,
        (false, false) => MessageKey::FlashErrorGeneric,
    };
    progress.finish(text(lang, final_key));

    result.into_result()?;
    Ok(())
}

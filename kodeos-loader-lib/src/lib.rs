//! Core of the kodeOS loader: finds ESP32-S3 serial ports, turns the user's
//! choices into `esptool` command lines, runs the tool and tracks the loader UI state.

pub mod command;
pub mod controller;
pub mod error;
pub mod i18n;
pub mod ports;
pub mod progress;
pub mod runner;

pub use command::{
    CommandInvocation, FlashOperation, FlashParameters, ToolSettings, build_command,
};
pub use controller::{ControllerState, Effect, Outcome, UiEvent, UiState};
pub use error::{Error, ErrorKind, Result};
pub use i18n::{Language, MessageKey};
pub use ports::{PortDescriptor, PortFilter, UsbId, list_candidate_ports};
pub use runner::{ProcessRunner, RunControl, RunEvent, RunHandle, RunResult, RunStatus};

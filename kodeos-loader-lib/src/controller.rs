//! Loader UI state machine
//!
//! [`UiState`] holds the current selections and the phase of the loader. Every
//! transition is a pure function `apply(state, event) -> (state, effect)`; the
//! front-end performs the returned [`Effect`] (spawning or killing the tool) and
//! feeds the outcome back as another event.
//!
//! ```text
//! Idle(noPort|noFile) --select--> Ready --flash--> Running --done--> Finished
//!                                   |                 ^                 |
//!                                   +--erase--> ConfirmingErase         +--ack/select--> Idle|Ready
//! ```

use crate::command::{FlashOperation, FlashParameters};
use crate::error::ErrorKind;
use crate::i18n::MessageKey;
use crate::ports::PortDescriptor;
use std::path::PathBuf;
use tracing::debug;

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Selecting,
    ConfirmingErase,
    Running {
        operation: FlashOperation,
        progress: Option<u8>,
        cancel_requested: bool,
    },
    Finished {
        operation: FlashOperation,
        outcome: Outcome,
    },
}

/// Observable state, derived from the phase and the selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle { no_port: bool, no_file: bool },
    Ready,
    ConfirmingErase,
    Running(FlashOperation),
    Finished(FlashOperation, Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SelectPort(Option<PortDescriptor>),
    /// A fresh enumeration result. Keeps the selection if still present, else picks the first.
    /// A finished run keeps its result on screen.
    PortsRefreshed(Vec<PortDescriptor>),
    /// Only emptiness is checked here; the caller validates the file before selecting it.
    SelectFirmware(Option<PathBuf>),
    SetAppFlash(bool),
    RequestFlash,
    RequestErase,
    ConfirmErase,
    AbortErase,
    Progress(u8),
    Cancel,
    RunFinished(Outcome),
    Acknowledge,
}

/// Side effect the front-end must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Build the command and start the tool.
    Launch {
        operation: FlashOperation,
        params: FlashParameters,
    },
    /// Kill the running tool.
    CancelRun,
    /// Show a transient message; the state did not change.
    Notify(MessageKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub key: MessageKey,
    pub level: Level,
    /// Set while a flash is running and the tool reported a percentage.
    pub percent: Option<u8>,
}

/// Which inputs are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub port_select: bool,
    pub firmware_select: bool,
    pub app_toggle: bool,
    pub flash: bool,
    pub erase: bool,
    pub cancel: bool,
    pub flash_caption: MessageKey,
    pub erase_caption: MessageKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    port: Option<PortDescriptor>,
    firmware: Option<PathBuf>,
    app_flash: bool,
    phase: Phase,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            port: None,
            firmware: None,
            app_flash: false,
            phase: Phase::Selecting,
        }
    }

    pub fn port(&self) -> Option<&PortDescriptor> {
        self.port.as_ref()
    }

    pub fn firmware(&self) -> Option<&PathBuf> {
        self.firmware.as_ref()
    }

    pub fn app_flash(&self) -> bool {
        self.app_flash
    }

    pub fn state(&self) -> ControllerState {
        match &self.phase {
            Phase::Selecting if self.port.is_some() && self.firmware.is_some() => {
                ControllerState::Ready
            }
            Phase::Selecting => ControllerState::Idle {
                no_port: self.port.is_none(),
                no_file: self.firmware.is_none(),
            },
            Phase::ConfirmingErase => ControllerState::ConfirmingErase,
            Phase::Running { operation, .. } => ControllerState::Running(*operation),
            Phase::Finished { operation, outcome } => {
                ControllerState::Finished(*operation, *outcome)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Tool output is shown only while a run is live and not being cancelled.
    pub fn accepts_output(&self) -> bool {
        matches!(
            self.phase,
            Phase::Running {
                cancel_requested: false,
                ..
            }
        )
    }

    fn selected_operation(&self) -> FlashOperation {
        if self.app_flash {
            FlashOperation::AppFlash
        } else {
            FlashOperation::StandardFlash
        }
    }

    fn params(&self, operation: FlashOperation) -> FlashParameters {
        FlashParameters {
            port: self.port.clone(),
            firmware: if operation.needs_firmware() {
                self.firmware.clone()
            } else {
                None
            },
        }
    }

    fn selection_allowed(&self) -> bool {
        matches!(self.phase, Phase::Selecting | Phase::Finished { .. })
    }

    /// Applies `event`, returning the next state and the effect to perform.
    pub fn apply(mut self, event: UiEvent) -> (UiState, Option<Effect>) {
        debug!("UI event {:?} in {:?}", event, self.state());
        let effect = match event {
            UiEvent::SelectPort(port) if self.selection_allowed() => {
                self.port = port.filter(|p| !p.name.trim().is_empty());
                self.phase = Phase::Selecting;
                None
            }
            UiEvent::PortsRefreshed(ports) if self.selection_allowed() => {
                let keep = self
                    .port
                    .as_ref()
                    .and_then(|current| ports.iter().find(|p| p.name == current.name));
                self.port = keep.or_else(|| ports.first()).cloned();
                if self.port.is_none() {
                    Some(Effect::Notify(MessageKey::NoPortsFound))
                } else {
                    None
                }
            }
            UiEvent::SelectFirmware(path) if self.selection_allowed() => {
                self.firmware = path.filter(|p| !p.as_os_str().is_empty());
                self.phase = Phase::Selecting;
                None
            }
            UiEvent::SetAppFlash(on) if self.selection_allowed() => {
                self.app_flash = on;
                self.phase = Phase::Selecting;
                None
            }
            UiEvent::RequestFlash => match self.state() {
                ControllerState::Ready => {
                    let operation = self.selected_operation();
                    self.phase = Phase::Running {
                        operation,
                        progress: None,
                        cancel_requested: false,
                    };
                    Some(Effect::Launch {
                        operation,
                        params: self.params(operation),
                    })
                }
                ControllerState::Idle { .. } => Some(Effect::Notify(MessageKey::ErrorMissingParams)),
                _ => None,
            },
            UiEvent::RequestErase => match self.state() {
                ControllerState::Ready | ControllerState::Idle { no_port: false, .. } => {
                    self.phase = Phase::ConfirmingErase;
                    None
                }
                ControllerState::Idle { no_port: true, .. } => {
                    Some(Effect::Notify(MessageKey::ErrorMissingPort))
                }
                _ => None,
            },
            UiEvent::ConfirmErase if self.phase == Phase::ConfirmingErase => {
                let operation = FlashOperation::Erase;
                self.phase = Phase::Running {
                    operation,
                    progress: None,
                    cancel_requested: false,
                };
                Some(Effect::Launch {
                    operation,
                    params: self.params(operation),
                })
            }
            UiEvent::AbortErase if self.phase == Phase::ConfirmingErase => {
                self.phase = Phase::Selecting;
                None
            }
            UiEvent::Progress(percent) => {
                if let Phase::Running {
                    operation,
                    progress,
                    cancel_requested: false,
                } = &mut self.phase
                {
                    if operation.needs_firmware() {
                        *progress = Some(percent.min(100));
                    }
                }
                None
            }
            UiEvent::Cancel => match &mut self.phase {
                Phase::Running {
                    cancel_requested, ..
                } if !*cancel_requested => {
                    *cancel_requested = true;
                    Some(Effect::CancelRun)
                }
                _ => None,
            },
            UiEvent::RunFinished(outcome) => {
                if let Phase::Running {
                    operation,
                    cancel_requested,
                    ..
                } = self.phase
                {
                    let outcome = if cancel_requested {
                        Outcome::Failure(ErrorKind::CancelledByUser)
                    } else {
                        outcome
                    };
                    self.phase = Phase::Finished { operation, outcome };
                }
                None
            }
            UiEvent::Acknowledge => {
                if matches!(self.phase, Phase::Finished { .. }) {
                    self.phase = Phase::Selecting;
                }
                None
            }
            // selection while confirming or running, stray confirmations
            _ => None,
        };
        (self, effect)
    }

    pub fn status(&self) -> Status {
        let (key, level, percent) = match &self.phase {
            Phase::Selecting if self.state() == ControllerState::Ready => {
                (MessageKey::StatusReady, Level::Info, None)
            }
            Phase::Selecting => (MessageKey::StatusSelect, Level::Info, None),
            Phase::ConfirmingErase => (MessageKey::EraseConfirmMessage, Level::Info, None),
            Phase::Running {
                operation: FlashOperation::Erase,
                ..
            } => (MessageKey::StatusErasingCritical, Level::Error, None),
            Phase::Running {
                progress: Some(pct),
                ..
            } => (MessageKey::FlashingProgress, Level::Info, Some(*pct)),
            Phase::Running { .. } => (MessageKey::StatusStarting, Level::Info, None),
            Phase::Finished { operation, outcome } => {
                let erase = *operation == FlashOperation::Erase;
                match outcome {
                    Outcome::Success if erase => (MessageKey::EraseSuccess, Level::Success, None),
                    Outcome::Success => (MessageKey::FlashSuccess, Level::Success, None),
                    Outcome::Failure(kind) => {
                        let key = match kind {
                            ErrorKind::CancelledByUser => MessageKey::Cancelled,
                            ErrorKind::NoPortSelected => MessageKey::ErrorMissingPort,
                            ErrorKind::InvalidParameters => MessageKey::ErrorInvalidFile,
                            ErrorKind::LaunchFailure => MessageKey::ErrorLaunch,
                            _ if erase => MessageKey::EraseError,
                            _ => MessageKey::FlashErrorGeneric,
                        };
                        (key, Level::Error, None)
                    }
                }
            }
        };
        Status {
            key,
            level,
            percent,
        }
    }

    pub fn controls(&self) -> Controls {
        let selecting = self.phase == Phase::Selecting;
        let selection = self.selection_allowed();
        let (flash_caption, erase_caption, cancel) = match &self.phase {
            Phase::Running {
                operation,
                cancel_requested,
                ..
            } => {
                if *operation == FlashOperation::Erase {
                    (
                        MessageKey::LoadButton,
                        MessageKey::EraseButtonErasing,
                        !*cancel_requested,
                    )
                } else {
                    (
                        MessageKey::LoadButtonLoading,
                        MessageKey::EraseButton,
                        !*cancel_requested,
                    )
                }
            }
            _ => (MessageKey::LoadButton, MessageKey::EraseButton, false),
        };
        Controls {
            port_select: selection,
            firmware_select: selection,
            app_toggle: selection,
            flash: selecting && self.state() == ControllerState::Ready,
            erase: selecting && self.port.is_some(),
            cancel,
            flash_caption,
            erase_caption,
        }
    }
}

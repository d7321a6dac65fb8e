//! Interactive loader session
//!
//! Terminal rendition of the loader window. Typed commands and tool output are
//! merged into one channel and handled on this thread; every state change goes
//! through [`UiState::apply`].

use anyhow::Result;
use kodeos_loader_lib::command::validate_firmware;
use kodeos_loader_lib::controller::{Level, Status};
use kodeos_loader_lib::i18n::{self, MessageKey, text};
use kodeos_loader_lib::progress::ProgressTracker;
use kodeos_loader_lib::{
    ControllerState, Effect, ErrorKind, Language, Outcome, PortDescriptor, ProcessRunner, RunControl,
    RunEvent, RunStatus, UiEvent, UiState, build_command, list_candidate_ports,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::cli::Settings;
use crate::exec::is_yes;
use crate::serial::normalize_port_name;

enum SessionEvent {
    Input(String),
    InputClosed,
    Run(RunEvent),
}

enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    settings: Settings,
    language: Language,
    state: UiState,
    ports: Vec<PortDescriptor>,
    runner: ProcessRunner,
    control: Option<RunControl>,
    tracker: ProgressTracker,
    quitting: bool,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            language: settings.language,
            settings,
            state: UiState::new(),
            ports: Vec::new(),
            runner: ProcessRunner::new(),
            control: None,
            tracker: ProgressTracker::new(),
            quitting: false,
            tx,
            rx,
        }
    }

    fn t(&self, key: MessageKey) -> String {
        text(self.language, key)
    }

    pub fn run(mut self) -> Result<()> {
        spawn_input_reader(self.tx.clone());

        println!("{}", self.t(MessageKey::WindowTitle));
        println!("{}", self.t(MessageKey::PortsLoading));
        self.refresh_ports();
        if let Some(name) = self.settings.port.clone() {
            self.select_port(&name);
        }
        self.render();
        self.prompt();

        while let Ok(event) = self.rx.recv() {
            let flow = match event {
                SessionEvent::Input(line) => self.handle_input(line.trim()),
                SessionEvent::InputClosed => {
                    self.quitting = true;
                    self.dispatch(UiEvent::Cancel);
                    Flow::Continue
                }
                SessionEvent::Run(event) => {
                    self.handle_run_event(event);
                    Flow::Continue
                }
            };

            if matches!(flow, Flow::Quit) || (self.quitting && !self.state.is_running()) {
                break;
            }
        }
        Ok(())
    }

    fn handle_input(&mut self, line: &str) -> Flow {
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        if self.state.state() == ControllerState::ConfirmingErase {
            let event = if is_yes(line) {
                UiEvent::ConfirmErase
            } else {
                UiEvent::AbortErase
            };
            self.dispatch(event);
            self.prompt();
            return Flow::Continue;
        }

        match command.to_lowercase().as_str() {
            "" => {}
            "help" | "?" => println!("{}", self.t(MessageKey::ShellHelp)),
            "ports" | "refresh" => {
                self.refresh_ports();
                self.print_ports();
            }
            "port" if !arg.is_empty() => self.select_port(arg),
            "file" if !arg.is_empty() => self.select_firmware(arg),
            "app" => match arg {
                "on" | "1" | "yes" => self.dispatch(UiEvent::SetAppFlash(true)),
                "off" | "0" | "no" => self.dispatch(UiEvent::SetAppFlash(false)),
                _ => println!("{}", self.t(MessageKey::ShellUsageApp)),
            },
            "flash" | "load" => {
                self.dispatch(UiEvent::Acknowledge);
                self.dispatch(UiEvent::RequestFlash);
            }
            "erase" => {
                self.dispatch(UiEvent::Acknowledge);
                self.dispatch(UiEvent::RequestErase);
            }
            "cancel" => self.dispatch(UiEvent::Cancel),
            "ok" => self.dispatch(UiEvent::Acknowledge),
            "lang" => match arg.parse::<Language>() {
                Ok(language) => {
                    self.language = language;
                    self.render();
                }
                Err(_) => println!("{}", self.t(MessageKey::ShellUsageLang)),
            },
            "status" => self.render(),
            "quit" | "exit" | "q" => {
                if self.state.is_running() {
                    self.quitting = true;
                    self.dispatch(UiEvent::Cancel);
                } else {
                    return Flow::Quit;
                }
            }
            _ => println!("{}", i18n::unknown_command(self.language, line)),
        }
        self.prompt();
        Flow::Continue
    }

    fn handle_run_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Line(line) => {
                if !self.state.accepts_output() {
                    return;
                }
                println!("{}", line);
                if let Some(percent) = self.tracker.observe(&line) {
                    self.dispatch(UiEvent::Progress(percent));
                }
            }
            RunEvent::Finished(result) => {
                self.control = None;
                let outcome = match result.status {
                    RunStatus::Success => Outcome::Success,
                    RunStatus::Failed { code } => {
                        println!(
                            "\nError (Return Code: {}). See details above.",
                            code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                        );
                        Outcome::Failure(ErrorKind::ToolReportedFailure)
                    }
                    RunStatus::Cancelled => {
                        Outcome::Failure(ErrorKind::CancelledByUser)
                    }
                };
                self.dispatch(UiEvent::RunFinished(outcome));
                // the board may have re-enumerated after a reset
                self.refresh_ports();
                self.prompt();
            }
        }
    }

    /// Applies one event and carries out the resulting effect.
    fn dispatch(&mut self, event: UiEvent) {
        let before = self.state.status();
        let quiet = matches!(event, UiEvent::Progress(_));
        let (state, effect) = std::mem::take(&mut self.state).apply(event);
        self.state = state;

        match effect {
            Some(Effect::Launch { operation, params }) => {
                self.tracker = ProgressTracker::new();
                let launched = build_command(&self.settings.tool, operation, &params)
                    .and_then(|invocation| {
                        println!(
                            "Executing {} with args: {:?}",
                            invocation.program, invocation.args
                        );
                        self.runner.run(&invocation)
                    });
                match launched {
                    Ok(handle) => {
                        self.control = Some(handle.control());
                        let tx = self.tx.clone();
                        thread::spawn(move || {
                            for event in handle {
                                if tx.send(SessionEvent::Run(event)).is_err() {
                                    break;
                                }
                            }
                        });
                    }
                    Err(e) => {
                        warn!("Could not start {}: {}", operation, e);
                        println!("{}", e);
                        let (state, _) = std::mem::take(&mut self.state)
                            .apply(UiEvent::RunFinished(Outcome::Failure(e.kind())));
                        self.state = state;
                    }
                }
            }
            Some(Effect::CancelRun) => {
                if let Some(control) = &self.control {
                    if let Err(e) = control.cancel() {
                        warn!("Failed to cancel the flashing tool: {}", e);
                    }
                }
            }
            Some(Effect::Notify(key)) => println!("{}", self.t(key)),
            None => {}
        }

        let after = self.state.status();
        if after != before && !quiet {
            self.print_status(&after);
        }
        if self.state.state() == ControllerState::ConfirmingErase && before != after {
            println!("{}", self.t(MessageKey::EraseConfirmTitle));
            print!("[y/N] ");
            let _ = io::stdout().flush();
        }
    }

    fn refresh_ports(&mut self) {
        self.ports = list_candidate_ports(&self.settings.filter);
        debug!("{} candidate ports", self.ports.len());
        self.dispatch(UiEvent::PortsRefreshed(self.ports.clone()));
    }

    fn select_port(&mut self, arg: &str) {
        let port = match arg.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.ports.len() => self.ports[n - 1].clone(),
            _ => {
                let name = normalize_port_name(arg);
                self.ports
                    .iter()
                    .find(|p| p.name == name)
                    .cloned()
                    .unwrap_or_else(|| PortDescriptor::new(name, ""))
            }
        };
        self.dispatch(UiEvent::SelectPort(Some(port)));
    }

    fn select_firmware(&mut self, arg: &str) {
        let path = PathBuf::from(arg);
        match validate_firmware(&path) {
            Ok(()) => self.dispatch(UiEvent::SelectFirmware(Some(path))),
            Err(e) => println!("{} ({})", self.t(MessageKey::ErrorInvalidFile), e),
        }
    }

    fn print_ports(&self) {
        if self.ports.is_empty() {
            println!("{}", self.t(MessageKey::NoPortsFound));
            return;
        }
        let selected = self.state.port().map(|p| p.name.as_str());
        for (i, port) in self.ports.iter().enumerate() {
            let marker = if Some(port.name.as_str()) == selected {
                "*"
            } else {
                " "
            };
            println!("{} {}: {}", marker, i + 1, port);
        }
    }

    fn print_status(&self, status: &Status) {
        let message = match status.percent {
            Some(percent) if status.key == MessageKey::FlashingProgress => {
                i18n::flashing_progress(self.language, percent)
            }
            _ => self.t(status.key),
        };
        let tag = match status.level {
            Level::Info => "--",
            Level::Success => "OK",
            Level::Error => "!!",
        };
        println!("[{}] {}", tag, message.replace('\n', " "));
    }

    fn render(&self) {
        let controls = self.state.controls();
        let none = "-".to_string();
        println!(
            "{} {}",
            self.t(MessageKey::SerialPortLabel),
            self.state.port().map_or(none.clone(), |p| p.to_string())
        );
        println!(
            "{} {}",
            self.t(MessageKey::FirmwareLabel),
            self.state
                .firmware()
                .map_or(none, |p| p.display().to_string())
        );
        println!(
            "[{}] {}",
            if self.state.app_flash() { "x" } else { " " },
            self.t(MessageKey::FlashAppCheckbox)
        );

        let mut actions = Vec::new();
        if controls.flash {
            actions.push(self.t(controls.flash_caption));
        }
        if controls.erase {
            actions.push(self.t(controls.erase_caption));
        }
        if controls.cancel {
            actions.push(self.t(MessageKey::CancelButton));
        }
        if !actions.is_empty() {
            println!("> {}", actions.join(" | "));
        }
        self.print_status(&self.state.status());

        let languages: Vec<String> = Language::iter()
            .map(|lang| {
                if lang == self.language {
                    format!("[{}]", lang.native_name())
                } else {
                    lang.native_name().to_string()
                }
            })
            .collect();
        println!("{}", languages.join(" | "));
    }

    fn prompt(&self) {
        if self.state.state() == ControllerState::ConfirmingErase {
            return;
        }
        print!("> ");
        let _ = io::stdout().flush();
    }
}

fn spawn_input_reader(tx: Sender<SessionEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(SessionEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(SessionEvent::InputClosed);
    });
}

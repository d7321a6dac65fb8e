//! External process runner
//!
//! Spawns the flashing tool, streams its combined stdout/stderr line by line and
//! reports the exit status. Both streams share one pipe so lines arrive in the
//! order the tool wrote them. Cancellation kills the tool's whole process group.

use crate::command::CommandInvocation;
use crate::error::{Error, Result};
use crate::progress::strip_ansi;
use std::io::{self, PipeReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Tool exited non-zero. `None` when it was killed by a signal.
    Failed { code: Option<i32> },
    Cancelled,
}

/// Terminal report of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub status: RunStatus,
    /// Every line the tool emitted, in order.
    pub lines: Vec<String>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn into_result(self) -> Result<Vec<String>> {
        match self.status {
            RunStatus::Success => Ok(self.lines),
            RunStatus::Failed { code } => Err(Error::ToolReportedFailure { code }),
            RunStatus::Cancelled => Err(Error::CancelledByUser),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Line(String),
    Finished(RunResult),
}

/// Splits a byte stream into lines on `\n`, `\r\n` and bare `\r`.
pub struct LineSplitter<R> {
    reader: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    pending: Vec<u8>,
    skip_lf: bool,
    eof: bool,
}

impl<R: Read> LineSplitter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0u8; 4 * 1024],
            start: 0,
            end: 0,
            pending: Vec::new(),
            skip_lf: false,
            eof: false,
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

impl<R: Read> Iterator for LineSplitter<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while self.start < self.end {
                let b = self.buf[self.start];
                self.start += 1;
                if std::mem::take(&mut self.skip_lf) && b == b'\n' {
                    continue;
                }
                match b {
                    b'\n' => return Some(Ok(self.take_line())),
                    b'\r' => {
                        self.skip_lf = true;
                        return Some(Ok(self.take_line()));
                    }
                    _ => self.pending.push(b),
                }
            }

            if self.eof {
                if self.pending.is_empty() {
                    return None;
                }
                return Some(Ok(self.take_line()));
            }

            match self.reader.read(&mut self.buf) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    self.start = 0;
                    self.end = n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Cloneable cancellation handle for a running tool.
#[derive(Clone)]
pub struct RunControl {
    child: Arc<Mutex<Child>>,
    cancelled: Arc<AtomicBool>,
    pid: u32,
}

impl RunControl {
    /// Requests termination of the tool and everything it started. Best effort.
    pub fn cancel(&self) -> io::Result<()> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("Cancelling tool process {}", self.pid);
        let mut child = self
            .child
            .lock()
            .map_err(|_| io::Error::other("tool process lock poisoned"))?;
        #[cfg(unix)]
        kill_process_group(self.pid)?;
        match child.kill() {
            Ok(()) => Ok(()),
            // already exited
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Live output of one tool run.
///
/// Iterating yields [`RunEvent::Line`]s in emission order and ends with exactly one
/// [`RunEvent::Finished`]. After [`RunHandle::cancel`] no further lines are yielded.
pub struct RunHandle {
    events: Receiver<RunEvent>,
    control: RunControl,
    finished: bool,
}

impl RunHandle {
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn cancel(&self) -> io::Result<()> {
        self.control.cancel()
    }

    /// Blocks until the next event. `None` once the run has finished.
    pub fn next_event(&mut self) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        loop {
            let event = self.events.recv().ok()?;
            if let Some(event) = self.filter(event) {
                return Some(event);
            }
        }
    }

    /// Like [`RunHandle::next_event`] but gives up after `timeout`.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<RunEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.events.recv_timeout(timeout) {
                Ok(event) => {
                    if let Some(event) = self.filter(event) {
                        return Some(event);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None;
                }
            }
        }
    }

    fn filter(&mut self, event: RunEvent) -> Option<RunEvent> {
        match event {
            RunEvent::Line(_) if self.control.is_cancelled() => None,
            RunEvent::Finished(result) => {
                self.finished = true;
                Some(RunEvent::Finished(result))
            }
            line => Some(line),
        }
    }

    /// Drains the run, forwarding every line to `on_line`, and returns the result.
    pub fn wait_with<F: FnMut(&str)>(mut self, mut on_line: F) -> RunResult {
        while let Some(event) = self.next_event() {
            match event {
                RunEvent::Line(line) => on_line(&line),
                RunEvent::Finished(result) => return result,
            }
        }
        RunResult {
            status: RunStatus::Failed { code: None },
            lines: Vec::new(),
        }
    }
}

impl Iterator for RunHandle {
    type Item = RunEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

/// Launches flashing tool invocations. Holds no state; callers enforce the
/// single-run-at-a-time rule.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, invocation: &CommandInvocation) -> Result<RunHandle> {
        debug!("Spawning {}", invocation);
        let (output, output_writer) = io::pipe()?;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            // python based tools buffer stdout when it is a pipe
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(output_writer.try_clone()?))
            .stderr(Stdio::from(output_writer));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let spawned = command.spawn();
        // closes our copies of the write end so the reader sees EOF
        drop(command);
        let child = spawned.map_err(|source| Error::LaunchFailure {
            program: invocation.program.clone(),
            source,
        })?;

        let pid = child.id();
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let reader = spawn_reader(output, tx.clone(), &cancelled, &captured);

        let control = RunControl {
            child: Arc::new(Mutex::new(child)),
            cancelled,
            pid,
        };

        let waiter_control = control.clone();
        thread::spawn(move || {
            let status = wait_for_exit(&waiter_control);
            // EOF means every process holding the pipe is gone, cancelled or not
            let _ = reader.join();

            let status = match status {
                _ if waiter_control.is_cancelled() => RunStatus::Cancelled,
                Ok(status) if status.success() => RunStatus::Success,
                Ok(status) => RunStatus::Failed {
                    code: status.code(),
                },
                Err(e) => {
                    warn!("Failed to wait for tool process {}: {}", pid, e);
                    RunStatus::Failed { code: None }
                }
            };
            info!("Tool process {} finished: {:?}", pid, status);

            let lines = captured
                .lock()
                .map(|lines| lines.clone())
                .unwrap_or_default();
            let _ = tx.send(RunEvent::Finished(RunResult { status, lines }));
        });

        Ok(RunHandle {
            events: rx,
            control,
            finished: false,
        })
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid).map_err(io::Error::other)?;
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        // group already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn wait_for_exit(control: &RunControl) -> io::Result<ExitStatus> {
    loop {
        {
            let mut child = control
                .child
                .lock()
                .map_err(|_| io::Error::other("tool process lock poisoned"))?;
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader(
    stream: PipeReader,
    tx: Sender<RunEvent>,
    cancelled: &Arc<AtomicBool>,
    captured: &Arc<Mutex<Vec<String>>>,
) -> JoinHandle<()> {
    let cancelled = Arc::clone(cancelled);
    let captured = Arc::clone(captured);
    thread::spawn(move || {
        for line in LineSplitter::new(stream) {
            let line = match line {
                Ok(line) => strip_ansi(&line),
                Err(e) => {
                    debug!("Tool output stream closed: {}", e);
                    break;
                }
            };
            // keep draining after a cancel so the pipe is held until EOF
            if cancelled.load(Ordering::SeqCst) {
                continue;
            }
            if let Ok(mut lines) = captured.lock() {
                lines.push(line.clone());
            }
            // a dropped handle still needs the pipe drained
            let _ = tx.send(RunEvent::Line(line));
        }
    })
}

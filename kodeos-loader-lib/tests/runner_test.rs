use kodeos_loader_lib::runner::LineSplitter;
use kodeos_loader_lib::{CommandInvocation, Error, ErrorKind, ProcessRunner, RunEvent, RunStatus};
use std::io::Cursor;
use std::time::{Duration, Instant};

fn split(input: &[u8]) -> Vec<String> {
    LineSplitter::new(Cursor::new(input.to_vec()))
        .map(|l| l.unwrap())
        .collect()
}

#[test]
fn splitter_handles_all_line_endings() {
    assert_eq!(split(b"a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
    assert_eq!(split(b"one\r\n\r\ntwo\n"), vec!["one", "", "two"]);
    assert!(split(b"").is_empty());
}

#[test]
fn splitter_keeps_lines_across_reads() {
    // a reader that hands out one byte at a time
    struct Trickle(Vec<u8>, usize);
    impl std::io::Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.1 >= self.0.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[self.1];
            self.1 += 1;
            Ok(1)
        }
    }
    let lines: Vec<String> = LineSplitter::new(Trickle(b"ab\r\ncd\r".to_vec(), 0))
        .map(|l| l.unwrap())
        .collect();
    assert_eq!(lines, vec!["ab", "cd"]);
}

#[test]
fn missing_program_is_a_launch_failure() {
    let invocation = CommandInvocation {
        program: "kodeos-loader-no-such-tool".to_string(),
        args: vec!["--version".to_string()],
    };
    let err = ProcessRunner::new().run(&invocation).err().unwrap();
    assert!(matches!(err, Error::LaunchFailure { .. }), "{err}");
}

#[cfg(unix)]
fn sh(script: &str) -> CommandInvocation {
    CommandInvocation {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

#[cfg(unix)]
#[test]
fn streams_three_lines_then_success() {
    let handle = ProcessRunner::new()
        .run(&sh("echo one; echo two; echo three"))
        .unwrap();
    let events: Vec<RunEvent> = handle.collect();

    assert_eq!(events.len(), 4);
    assert_eq!(events[0], RunEvent::Line("one".to_string()));
    assert_eq!(events[1], RunEvent::Line("two".to_string()));
    assert_eq!(events[2], RunEvent::Line("three".to_string()));
    match &events[3] {
        RunEvent::Finished(result) => {
            assert_eq!(result.status, RunStatus::Success);
            assert_eq!(result.lines, vec!["one", "two", "three"]);
        }
        other => panic!("expected final result, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn nonzero_exit_is_a_tool_failure() {
    let handle = ProcessRunner::new()
        .run(&sh("echo 'A fatal error occurred' 1>&2; exit 2"))
        .unwrap();
    let mut seen = Vec::new();
    let result = handle.wait_with(|line| seen.push(line.to_string()));

    assert_eq!(seen, vec!["A fatal error occurred"]);
    assert_eq!(result.status, RunStatus::Failed { code: Some(2) });
    assert!(matches!(
        result.into_result(),
        Err(Error::ToolReportedFailure { code: Some(2) })
    ));
}

#[cfg(unix)]
#[test]
fn output_is_cleaned_of_ansi_codes() {
    let handle = ProcessRunner::new()
        .run(&sh(r"printf '\033[32mWriting at 0x00010000... (50 %)\033[0m\n'"))
        .unwrap();
    let result = handle.wait_with(|_| {});
    assert_eq!(result.lines, vec!["Writing at 0x00010000... (50 %)"]);
}

#[cfg(unix)]
#[test]
fn cancel_stops_output_and_reports_cancelled() {
    let mut handle = ProcessRunner::new()
        .run(&sh("echo started; sleep 5; echo too-late"))
        .unwrap();

    let first = handle.next_event_timeout(Duration::from_secs(5));
    assert_eq!(first, Some(RunEvent::Line("started".to_string())));

    handle.cancel().unwrap();
    let rest: Vec<RunEvent> = handle.collect();
    assert_eq!(rest.len(), 1, "{rest:?}");
    match &rest[0] {
        RunEvent::Finished(result) => {
            assert_eq!(result.status, RunStatus::Cancelled);
            assert!(!result.lines.iter().any(|l| l == "too-late"));
            assert!(matches!(
                result.clone().into_result(),
                Err(Error::CancelledByUser)
            ));
        }
        other => panic!("expected final result, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn stdout_and_stderr_keep_their_interleaving() {
    let result = ProcessRunner::new()
        .run(&sh(
            "i=0; while [ $i -lt 200 ]; do echo o$i; echo e$i >&2; i=$((i+1)); done",
        ))
        .unwrap()
        .wait_with(|_| {});

    let expected: Vec<String> = (0..200)
        .flat_map(|i| [format!("o{i}"), format!("e{i}")])
        .collect();
    assert!(result.is_success());
    assert_eq!(result.lines, expected);
}

#[cfg(unix)]
#[test]
fn cancel_takes_down_processes_the_tool_started() {
    // the background sleep inherits the output pipe
    let mut handle = ProcessRunner::new()
        .run(&sh("sleep 30 & echo started; wait"))
        .unwrap();
    let first = handle.next_event_timeout(Duration::from_secs(5));
    assert_eq!(first, Some(RunEvent::Line("started".to_string())));

    let cancelled_at = Instant::now();
    handle.cancel().unwrap();
    let last = handle.next_event_timeout(Duration::from_secs(10));
    match last {
        Some(RunEvent::Finished(result)) => assert_eq!(result.status, RunStatus::Cancelled),
        other => panic!("expected final result, got {other:?}"),
    }
    assert!(cancelled_at.elapsed() < Duration::from_secs(10));
}

#[test]
fn pipe_setup_errors_classify_as_io() {
    let err = Error::from(std::io::Error::other("too many open files"));
    assert_eq!(err.kind(), ErrorKind::Io);
}

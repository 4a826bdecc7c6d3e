//! Live tracer sessions against real system binaries. These run only where
//! the tracer itself runs; each test skips quietly if the helper binary is
//! not present on the host.
#![cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use malsight::dynamic::{trace, TraceEventKind, TraceOptions};

fn find_tool(name: &str) -> Option<PathBuf> {
    for dir in ["/bin", "/usr/bin"] {
        let candidate = Path::new(dir).join(name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[test]
fn open_of_a_known_path_is_recorded_and_exit_is_terminal() {
    let Some(cat) = find_tool("cat") else { return };
    let dir = tempfile::tempdir().unwrap();
    let known = dir.path().join("known_file");
    std::fs::write(&known, b"tracer fixture\n").unwrap();

    let events = trace(&TraceOptions {
        exec_path: cat,
        args: vec![known.display().to_string()],
        timeout: Duration::from_secs(30),
    })
    .expect("tracing should be available on Linux");

    let open_idx = events
        .iter()
        .position(|e| e.kind == TraceEventKind::Open && e.detail.contains("known_file"))
        .expect("the traced open of the fixture path must be visible");

    let exit_idx = events
        .iter()
        .position(|e| e.kind == TraceEventKind::Exit)
        .expect("a terminal event must exist");
    assert!(open_idx < exit_idx);

    // Exactly one terminal event, and it is the last one.
    let terminals: Vec<_> = events
        .iter()
        .filter(|e| e.kind == TraceEventKind::Exit)
        .collect();
    assert_eq!(terminals.len(), 1);
    assert_eq!(terminals[0].detail, "normal");
    assert_eq!(terminals[0].value, 0);
    assert_eq!(events.last().unwrap().kind, TraceEventKind::Exit);
}

#[test]
fn exec_of_the_target_itself_is_recorded() {
    let Some(echo) = find_tool("echo") else { return };
    let events = trace(&TraceOptions {
        exec_path: echo.clone(),
        args: vec!["hello".into()],
        timeout: Duration::from_secs(30),
    })
    .unwrap();

    assert!(events
        .iter()
        .any(|e| e.kind == TraceEventKind::Exec && e.detail.contains("echo")));
    // echo writes its argument to stdout
    assert!(events
        .iter()
        .any(|e| e.kind == TraceEventKind::Write && e.detail == "fd=1" && e.value > 0));
}

#[test]
fn nonzero_exit_code_is_reported() {
    let Some(false_bin) = find_tool("false") else { return };
    let events = trace(&TraceOptions {
        exec_path: false_bin,
        args: Vec::new(),
        timeout: Duration::from_secs(30),
    })
    .unwrap();

    let last = events.last().unwrap();
    assert_eq!(last.kind, TraceEventKind::Exit);
    assert_eq!(last.detail, "normal");
    assert_eq!(last.value, 1);
}

#[test]
fn sleeping_target_hits_the_timeout_and_is_killed() {
    let Some(sleep_bin) = find_tool("sleep") else { return };
    let started = Instant::now();
    let events = trace(&TraceOptions {
        exec_path: sleep_bin,
        args: vec!["2".into()],
        timeout: Duration::from_secs(1),
    })
    .unwrap();

    let last = events.last().unwrap();
    assert_eq!(last.kind, TraceEventKind::Exit);
    assert_eq!(last.detail, "timeout");
    assert_eq!(last.value, -1);

    // The deadline is cooperative: the overshoot is bounded by the child's
    // syscall round-trip, well under the full sleep plus slack.
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn unspawnable_target_still_produces_a_session() {
    // The exec happens after the tracer attaches, so a bad path is not a
    // setup failure: the child reports exit 127 through the timeline.
    let events = trace(&TraceOptions {
        exec_path: PathBuf::from("/nonexistent/definitely-not-here"),
        args: Vec::new(),
        timeout: Duration::from_secs(30),
    })
    .unwrap();

    let last = events.last().unwrap();
    assert_eq!(last.kind, TraceEventKind::Exit);
    assert_eq!(last.detail, "normal");
    assert_eq!(last.value, 127);
}

#[test]
fn nul_byte_in_path_is_unavailable() {
    let result = trace(&TraceOptions {
        exec_path: PathBuf::from("bad\0path"),
        args: Vec::new(),
        timeout: Duration::from_secs(1),
    });
    assert!(result.is_err());
}

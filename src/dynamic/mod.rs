//! Dynamic analysis: run a target executable under ptrace and record a
//! bounded timeline of its syscalls.
//!
//! Linux on x86_64/aarch64 only; everywhere else `trace` reports
//! [`TraceError::Unavailable`]. One session traces exactly one child;
//! descendants created via fork/clone are a stated scope limit and are not
//! followed.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
mod arch;
#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
mod tracer;

/// What a trace session should run, and for how long.
#[derive(Debug, Clone)]
pub struct TraceOptions {
    pub exec_path: PathBuf,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// Kinds of recorded behavior. `Exit` is terminal and appears exactly once
/// per completed session, qualified by its detail string
/// (`"normal"`, `"signal"`, or `"timeout"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventKind {
    Exec,
    Open,
    Connect,
    Write,
    Exit,
}

/// One observed behavior of the traced child.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    #[serde(rename = "type")]
    pub kind: TraceEventKind,
    pub detail: String,
    pub value: i64,
}

impl TraceEvent {
    pub(crate) fn new(kind: TraceEventKind, detail: impl Into<String>, value: i64) -> Self {
        Self {
            kind,
            detail: detail.into(),
            value,
        }
    }
}

/// Why a trace could not run at all.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The host lacks ptrace support, or the child could not be spawned
    /// and attached.
    #[error("dynamic tracing unavailable: {0}")]
    Unavailable(String),
}

/// Trace a target executable until it exits or the timeout expires.
///
/// Setup failures (fork, attach, the initial stop) return
/// [`TraceError::Unavailable`] with no side effects, never a partial
/// event list. Once the session is running, the child is guaranteed to be
/// gone by the time this returns.
#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
pub fn trace(opts: &TraceOptions) -> Result<Vec<TraceEvent>, TraceError> {
    tracer::trace_child(opts)
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
pub fn trace(_opts: &TraceOptions) -> Result<Vec<TraceEvent>, TraceError> {
    Err(TraceError::Unavailable(
        "ptrace-based tracing requires Linux on x86_64 or aarch64".into(),
    ))
}

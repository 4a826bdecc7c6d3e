//! The syscall-boundary state machine.
//!
//! One session owns one child: spawn it suspended before any target code
//! runs, step it through syscall stops decoding the allow-list on entries
//! only, and guarantee the child is not running by the time the session
//! returns.

use std::ffi::CString;
use std::net::Ipv4Addr;
use std::os::unix::ffi::OsStrExt;
use std::time::Instant;

use nix::sys::ptrace::{self, Options};
use nix::sys::signal::{self, raise, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execv, fork, ForkResult, Pid};
use tracing::{debug, warn};

use super::arch::{host_decoder, read_registers, ArchDecoder, SyscallKind};
use super::{TraceError, TraceEvent, TraceEventKind, TraceOptions};

/// Longest string copied out of the child's address space.
const MAX_COPY_BYTES: usize = 256;

pub(super) fn trace_child(opts: &TraceOptions) -> Result<Vec<TraceEvent>, TraceError> {
    let program = CString::new(opts.exec_path.as_os_str().as_bytes())
        .map_err(|_| TraceError::Unavailable("executable path contains a NUL byte".into()))?;
    let mut argv = vec![program.clone()];
    for arg in &opts.args {
        argv.push(
            CString::new(arg.as_bytes())
                .map_err(|_| TraceError::Unavailable("argument contains a NUL byte".into()))?,
        );
    }

    // argv is built before forking; the child only execs or dies.
    let child = match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            if ptrace::traceme().is_err() {
                unsafe { libc::_exit(127) };
            }
            // Self-suspend so the parent is attached before any target
            // instruction executes.
            let _ = raise(Signal::SIGSTOP);
            let _ = execv(&program, &argv);
            unsafe { libc::_exit(127) }
        }
        Ok(ForkResult::Parent { child }) => child,
        Err(e) => return Err(TraceError::Unavailable(format!("fork failed: {e}"))),
    };

    match waitpid(child, None) {
        Ok(WaitStatus::Stopped(_, _)) => {}
        Ok(status) => {
            // traceme failed in the child, or it died before stopping;
            // that wait already reaped it.
            return Err(TraceError::Unavailable(format!(
                "child never reached its initial stop: {status:?}"
            )));
        }
        Err(e) => {
            return Err(TraceError::Unavailable(format!(
                "waiting for the initial stop failed: {e}"
            )))
        }
    }

    let mut session = TraceSession {
        child,
        at_entry: true,
        deadline: Instant::now() + opts.timeout,
        events: Vec::new(),
    };

    if let Err(e) = ptrace::setoptions(child, Options::PTRACE_O_TRACESYSGOOD) {
        session.kill_and_reap();
        return Err(TraceError::Unavailable(format!(
            "PTRACE_SETOPTIONS failed: {e}"
        )));
    }
    if let Err(e) = ptrace::syscall(child, None) {
        session.kill_and_reap();
        return Err(TraceError::Unavailable(format!(
            "resuming the child failed: {e}"
        )));
    }

    debug!(pid = child.as_raw(), "trace session started");
    session.run(host_decoder());
    Ok(session.events)
}

/// Controller state for one child. Never reused across invocations.
struct TraceSession {
    child: Pid,
    /// The next syscall stop is an entry; strictly alternates.
    at_entry: bool,
    deadline: Instant,
    events: Vec<TraceEvent>,
}

impl TraceSession {
    fn run(&mut self, decoder: &dyn ArchDecoder) {
        loop {
            // The deadline is cooperative, checked between waits: worst
            // case overshoot is one syscall round-trip of the child.
            if Instant::now() >= self.deadline {
                self.kill_and_reap();
                self.push_exit("timeout", -1);
                return;
            }

            let status = match waitpid(self.child, None) {
                Ok(status) => status,
                Err(e) => {
                    // Fatal to the session; keep what was collected.
                    warn!("waitpid failed mid-session: {e}");
                    self.kill_and_reap();
                    return;
                }
            };

            match status {
                WaitStatus::Exited(_, code) => {
                    self.push_exit("normal", code as i64);
                    return;
                }
                WaitStatus::Signaled(_, sig, _) => {
                    self.push_exit("signal", sig as i64);
                    return;
                }
                WaitStatus::PtraceSyscall(_) => {
                    if self.at_entry {
                        self.decode_entry(decoder);
                    }
                    self.at_entry = !self.at_entry;
                    let _ = ptrace::syscall(self.child, None);
                }
                // The post-exec SIGTRAP is a tracing artifact, not target
                // behavior: suppress it without touching the syscall flag.
                WaitStatus::Stopped(_, Signal::SIGTRAP) => {
                    let _ = ptrace::syscall(self.child, None);
                }
                // Genuine signal delivery is forwarded to the child.
                WaitStatus::Stopped(_, sig) => {
                    let _ = ptrace::syscall(self.child, sig);
                }
                _ => {
                    let _ = ptrace::syscall(self.child, None);
                }
            }
        }
    }

    /// Decode one allow-listed syscall at its entry stop. A failed register
    /// or memory read drops this event only; the session continues.
    fn decode_entry(&mut self, decoder: &dyn ArchDecoder) {
        let Ok(regs) = read_registers(self.child) else {
            return;
        };
        let Some(kind) = decoder.classify(decoder.syscall_number(&regs)) else {
            return;
        };
        let args = decoder.args(&regs);
        match kind {
            SyscallKind::Exec => {
                let path = read_child_str(self.child, args[0]);
                self.events
                    .push(TraceEvent::new(TraceEventKind::Exec, path, 0));
            }
            SyscallKind::Open => {
                let path = read_child_str(self.child, args[1]);
                self.events
                    .push(TraceEvent::new(TraceEventKind::Open, path, 0));
            }
            SyscallKind::Connect => {
                if let Some(detail) = read_sockaddr(self.child, args[1]) {
                    self.events
                        .push(TraceEvent::new(TraceEventKind::Connect, detail, 0));
                }
            }
            SyscallKind::Write => {
                // No pointer dereference: fd and count are in registers.
                self.events.push(TraceEvent::new(
                    TraceEventKind::Write,
                    format!("fd={}", args[0] as i64),
                    args[2] as i64,
                ));
            }
        }
    }

    fn push_exit(&mut self, detail: &str, value: i64) {
        self.events
            .push(TraceEvent::new(TraceEventKind::Exit, detail, value));
    }

    /// Force the child down and reap it; a no-op if it is already gone.
    fn kill_and_reap(&mut self) {
        let _ = signal::kill(self.child, Signal::SIGKILL);
        // SIGKILL terminates even a ptrace-stopped tracee; drain stale stop
        // notifications until the terminal status arrives.
        loop {
            match waitpid(self.child, None) {
                Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    }
}

/// Copy a NUL-terminated string out of the child one word at a time,
/// stopping at a NUL, a non-printable byte, a failed read, or
/// [`MAX_COPY_BYTES`], whichever comes first, so a hostile target cannot
/// feed back unbounded or binary garbage.
fn read_child_str(pid: Pid, addr: u64) -> String {
    let mut out = String::new();
    let word_len = std::mem::size_of::<libc::c_long>();
    let mut offset = 0usize;
    while offset < MAX_COPY_BYTES {
        let ptr = (addr as usize).wrapping_add(offset) as ptrace::AddressType;
        let Ok(word) = ptrace::read(pid, ptr) else {
            break;
        };
        for byte in word.to_ne_bytes() {
            if byte == 0 || !(0x20..0x7f).contains(&byte) {
                return out;
            }
            out.push(byte as char);
            if out.len() >= MAX_COPY_BYTES {
                return out;
            }
        }
        offset += word_len;
    }
    out
}

/// Best-effort decode of an IPv4 socket address in the child. One word
/// covers the sockaddr_in prefix: family, big-endian port, and the four
/// address bytes. Other families are reported without further decoding;
/// an unreadable pointer yields no event at all.
fn read_sockaddr(pid: Pid, addr: u64) -> Option<String> {
    let ptr = (addr as usize) as ptrace::AddressType;
    let word = ptrace::read(pid, ptr).ok()?;
    let bytes = word.to_ne_bytes();
    let family = u16::from_ne_bytes([bytes[0], bytes[1]]);
    if family != libc::AF_INET as u16 {
        return Some("non-IPv4".to_string());
    }
    let port = u16::from_be_bytes([bytes[2], bytes[3]]);
    let ip = Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
    Some(format!("{ip}:{port}"))
}

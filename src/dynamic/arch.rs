//! Per-architecture syscall decoding.
//!
//! Everything that depends on the CPU's calling convention (which
//! register carries the syscall number, where the six arguments live, and
//! which numbers map to the decoded allow-list) sits behind
//! [`ArchDecoder`], selected once per session. The tracer's state machine
//! never branches on architecture.

use nix::sys::ptrace;
use nix::unistd::Pid;

/// Raw register snapshot for the host architecture.
pub(crate) type RegSnapshot = libc::user_regs_struct;

/// Syscalls the tracer decodes into events; anything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SyscallKind {
    Exec,
    Open,
    Connect,
    Write,
}

pub(crate) trait ArchDecoder {
    fn syscall_number(&self, regs: &RegSnapshot) -> u64;
    fn args(&self, regs: &RegSnapshot) -> [u64; 6];
    fn classify(&self, number: u64) -> Option<SyscallKind>;
}

#[cfg(target_arch = "x86_64")]
pub(crate) struct Amd64Decoder;

#[cfg(target_arch = "x86_64")]
impl ArchDecoder for Amd64Decoder {
    fn syscall_number(&self, regs: &RegSnapshot) -> u64 {
        regs.orig_rax
    }

    fn args(&self, regs: &RegSnapshot) -> [u64; 6] {
        [regs.rdi, regs.rsi, regs.rdx, regs.r10, regs.r8, regs.r9]
    }

    fn classify(&self, number: u64) -> Option<SyscallKind> {
        match number {
            59 => Some(SyscallKind::Exec),    // execve
            257 => Some(SyscallKind::Open),   // openat
            42 => Some(SyscallKind::Connect), // connect
            1 => Some(SyscallKind::Write),    // write
            _ => None,
        }
    }
}

#[cfg(target_arch = "aarch64")]
pub(crate) struct Aarch64Decoder;

#[cfg(target_arch = "aarch64")]
impl ArchDecoder for Aarch64Decoder {
    fn syscall_number(&self, regs: &RegSnapshot) -> u64 {
        regs.regs[8]
    }

    fn args(&self, regs: &RegSnapshot) -> [u64; 6] {
        [
            regs.regs[0],
            regs.regs[1],
            regs.regs[2],
            regs.regs[3],
            regs.regs[4],
            regs.regs[5],
        ]
    }

    fn classify(&self, number: u64) -> Option<SyscallKind> {
        match number {
            221 => Some(SyscallKind::Exec),    // execve
            56 => Some(SyscallKind::Open),     // openat
            203 => Some(SyscallKind::Connect), // connect
            64 => Some(SyscallKind::Write),    // write
            _ => None,
        }
    }
}

/// The decoder for the architecture this binary was built for.
pub(crate) fn host_decoder() -> &'static dyn ArchDecoder {
    #[cfg(target_arch = "x86_64")]
    return &Amd64Decoder;
    #[cfg(target_arch = "aarch64")]
    return &Aarch64Decoder;
}

/// Fetch the child's registers at the current ptrace stop.
#[cfg(target_arch = "x86_64")]
pub(crate) fn read_registers(pid: Pid) -> nix::Result<RegSnapshot> {
    ptrace::getregs(pid)
}

#[cfg(target_arch = "aarch64")]
pub(crate) fn read_registers(pid: Pid) -> nix::Result<RegSnapshot> {
    ptrace::getregset::<ptrace::regset::NT_PRSTATUS>(pid)
}

//! Malsight inspects an untrusted executable and produces structured
//! evidence about it: a static description of its binary layout (headers,
//! sections, imports, per-section entropy) and, optionally, a timeline of
//! its runtime behavior captured by stepping it through syscall boundaries
//! under ptrace.
//!
//! The parsers never trust a declared offset or size: every ranged read is
//! bounds-checked against the input buffer, so arbitrary header field
//! values can degrade the result but never cause an out-of-range access.

/// Dynamic syscall tracing (Linux only)
pub mod dynamic;
/// Shannon entropy primitives
pub mod entropy;
/// Crate-level error type
pub mod error;
/// Binary format detection and the PE/ELF parsers
pub mod formats;
/// Cryptographic hashing
pub mod hashing;
/// Size-capped file reading
pub mod io;
/// Logging and tracing setup
pub mod logging;
/// Report assembly and serialization
pub mod report;
/// Byte-pattern signature database
pub mod signatures;
/// Printable string extraction
pub mod strings;

pub use error::{MalsightError, Result};

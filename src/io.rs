//! Size-capped file reading.
//!
//! The analysis pipeline never sees a buffer larger than the configured
//! limit; the size check happens before any bytes are read.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Read a whole regular file, refusing anything larger than `max_bytes`.
pub fn read_file_limited(path: &Path, max_bytes: u64) -> io::Result<Vec<u8>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", path.display()),
        ));
    }

    let size = metadata.len();
    if size > max_bytes {
        warn!(
            "refusing {}: {} bytes exceeds the {} byte limit",
            path.display(),
            size,
            max_bytes
        );
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("file too large: {size} bytes (limit: {max_bytes})"),
        ));
    }

    debug!("reading {} ({} bytes)", path.display(), size);
    fs::read(path)
}

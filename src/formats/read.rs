//! Bounds-checked reads over untrusted buffers.
//!
//! Every multi-byte field read in both parsers routes through this trait,
//! so the no-out-of-bounds invariant lives in one place instead of at each
//! call site. All offset arithmetic is overflow-checked; a read that would
//! leave the buffer returns `None`, never panics.

/// Extension trait for reading little-endian primitives from byte slices.
pub trait ReadExt {
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Option<u64>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
    fn read_cstr_at(&self, offset: usize, max_len: usize) -> Option<String>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.read_slice_at(offset, 2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.read_slice_at(offset, 4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Option<u64> {
        self.read_slice_at(offset, 8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.get(offset..end)
    }

    fn read_cstr_at(&self, offset: usize, max_len: usize) -> Option<String> {
        if offset >= self.len() {
            return None;
        }
        let end = offset.saturating_add(max_len).min(self.len());
        let slice = &self[offset..end];
        let n = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
        Some(String::from_utf8_lossy(&slice[..n]).into_owned())
    }
}

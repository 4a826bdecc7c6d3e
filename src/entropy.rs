//! Shannon entropy primitives.
//!
//! Entropy is measured in bits per byte, in [0.0, 8.0]. High values over an
//! executable's section usually indicate packed, compressed, or encrypted
//! content.

use std::ops::Range;

/// Calculates the Shannon entropy of a byte slice.
///
/// Returns 0.0 for an empty slice, up to 8.0 for a uniform distribution.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0u64; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let len = data.len() as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Entropy of a sub-range, clamped to the slice bounds.
pub fn entropy_range(data: &[u8], range: Range<usize>) -> f64 {
    let start = range.start.min(data.len());
    let end = range.end.min(data.len());
    if start >= end {
        return 0.0;
    }
    shannon_entropy(&data[start..end])
}

/// Entropy of each disjoint `chunk`-sized window of `data`.
///
/// A trailing partial chunk is not scored. Useful as a packed-region hint:
/// a mostly-plain file with one saturated chunk reads very differently from
/// a uniformly dense one.
pub fn chunk_entropy(data: &[u8], chunk: usize) -> Vec<f64> {
    if chunk == 0 || data.len() < chunk {
        return Vec::new();
    }
    data.chunks_exact(chunk).map(shannon_entropy).collect()
}

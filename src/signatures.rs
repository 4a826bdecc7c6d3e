//! Byte-pattern signature database.
//!
//! Signatures come from a JSON array of `{name, category, hex}` records,
//! where `hex` is a space-separated list of byte tokens and `??` marks a
//! wildcard byte. Matching reports each signature at most once.

use memchr::memchr_iter;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::{MalsightError, Result};

#[derive(Debug, Deserialize)]
struct RawSignature {
    name: String,
    #[serde(default)]
    category: String,
    hex: String,
}

/// A compiled signature pattern; `None` entries match any byte.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub category: String,
    pub pattern: Vec<Option<u8>>,
}

/// Parse a signature database from JSON text.
///
/// Unparseable byte tokens are skipped; records with an empty pattern are
/// dropped.
pub fn load_signatures(json_text: &str) -> Result<Vec<Signature>> {
    let raw: Vec<RawSignature> = serde_json::from_str(json_text)
        .map_err(|e| MalsightError::SignatureDb(e.to_string()))?;

    let mut out = Vec::with_capacity(raw.len());
    for r in raw {
        let pattern: Vec<Option<u8>> = r
            .hex
            .split_whitespace()
            .filter_map(|tok| {
                if tok == "??" {
                    Some(None)
                } else {
                    u8::from_str_radix(tok, 16).ok().map(Some)
                }
            })
            .collect();
        if pattern.is_empty() {
            warn!("signature '{}' has no usable pattern, skipping", r.name);
            continue;
        }
        out.push(Signature {
            name: r.name,
            category: r.category,
            pattern,
        });
    }
    debug!("loaded {} signatures", out.len());
    Ok(out)
}

/// Load a signature database from a file.
pub fn load_signatures_file(path: &Path) -> Result<Vec<Signature>> {
    let text = std::fs::read_to_string(path)?;
    load_signatures(&text)
}

/// Names of signatures whose pattern occurs anywhere in `data`.
pub fn match_signatures(data: &[u8], sigs: &[Signature]) -> Vec<String> {
    sigs.iter()
        .filter(|s| matches_anywhere(data, &s.pattern))
        .map(|s| s.name.clone())
        .collect()
}

fn matches_anywhere(data: &[u8], pattern: &[Option<u8>]) -> bool {
    if pattern.is_empty() || data.len() < pattern.len() {
        return false;
    }
    let last_start = data.len() - pattern.len();
    match pattern[0] {
        // Anchor candidate positions on the first concrete byte.
        Some(first) => {
            memchr_iter(first, &data[..=last_start]).any(|i| matches_at(data, i, pattern))
        }
        None => (0..=last_start).any(|i| matches_at(data, i, pattern)),
    }
}

fn matches_at(data: &[u8], at: usize, pattern: &[Option<u8>]) -> bool {
    pattern
        .iter()
        .zip(&data[at..])
        .all(|(p, &b)| p.map_or(true, |v| v == b))
}

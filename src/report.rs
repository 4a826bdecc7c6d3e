//! Report assembly and serialization.
//!
//! The report tree mirrors what downstream tooling consumes: file
//! identity, hashes, static layout evidence, extracted strings, and the
//! dynamic timeline. Entropy serializes as an integer scaled by 1000 so
//! three decimals survive without a floating-point JSON representation.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

use crate::dynamic::TraceEvent;
use crate::formats::elf::ElfInfo;
use crate::formats::pe::PeInfo;
use crate::formats::Format;
use crate::Result;

/// Scale an entropy value to an integer with three preserved decimals.
pub fn scale_entropy(entropy: f64) -> i64 {
    (entropy * 1000.0) as i64
}

/// UTC timestamp for the `generated` field.
pub fn generated_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated: String,
    pub file: FileRecord,
    pub hashes: HashRecord,
    #[serde(rename = "static")]
    pub static_analysis: StaticRecord,
    pub strings: Vec<String>,
    pub dynamic: DynamicRecord,
}

#[derive(Debug, Serialize)]
pub struct FileRecord {
    pub path: String,
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub format: Format,
}

#[derive(Debug, Serialize)]
pub struct HashRecord {
    pub sha256: String,
}

#[derive(Debug, Serialize)]
pub struct StaticRecord {
    pub entropy_bpb: i64,
    pub signatures: Vec<String>,
    pub specific: FormatRecord,
}

/// Format-specific evidence; an empty object when nothing was recognized
/// or the image was malformed past its magic.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FormatRecord {
    Pe {
        timestamp: u32,
        sections: Vec<PeSectionRecord>,
        imports: Vec<String>,
    },
    Elf {
        is64: bool,
        sections: Vec<ElfSectionRecord>,
    },
    None {},
}

#[derive(Debug, Serialize)]
pub struct PeSectionRecord {
    pub name: String,
    pub vsize: u32,
    pub vaddr: u32,
    pub rsize: u32,
    pub rptr: u32,
    pub entropy: i64,
}

#[derive(Debug, Serialize)]
pub struct ElfSectionRecord {
    pub name: String,
    pub addr: u64,
    pub off: u64,
    pub size: u64,
    pub entropy: i64,
}

impl From<&PeInfo> for FormatRecord {
    fn from(info: &PeInfo) -> Self {
        FormatRecord::Pe {
            timestamp: info.timestamp,
            sections: info
                .sections
                .iter()
                .map(|s| PeSectionRecord {
                    name: s.name.clone(),
                    vsize: s.vsize,
                    vaddr: s.vaddr,
                    rsize: s.rsize,
                    rptr: s.rptr,
                    entropy: scale_entropy(s.entropy),
                })
                .collect(),
            imports: info.imports.clone(),
        }
    }
}

impl From<&ElfInfo> for FormatRecord {
    fn from(info: &ElfInfo) -> Self {
        FormatRecord::Elf {
            is64: info.is64,
            sections: info
                .sections
                .iter()
                .map(|s| ElfSectionRecord {
                    name: s.name.clone(),
                    addr: s.addr,
                    off: s.off,
                    size: s.size,
                    entropy: scale_entropy(s.entropy),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DynamicRecord {
    pub events: Vec<TraceEvent>,
}

const HTML_TEMPLATE: &str = include_str!("../templates/report.html");

impl Report {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn write_html(&self, path: &Path) -> Result<()> {
        let html = render_html(HTML_TEMPLATE, &self.generated, &self.to_json()?);
        std::fs::write(path, html)?;
        Ok(())
    }
}

/// Substitute the `{{generated}}` and `{{json_blob}}` template placeholders.
fn render_html(template: &str, generated: &str, json_blob: &str) -> String {
    template
        .replacen("{{generated}}", generated, 1)
        .replacen("{{json_blob}}", json_blob, 1)
}

//! Whole-pipeline smoke test: read a synthetic PE from disk, run every
//! static stage, and check the serialized report shape end to end.

mod common;

use common::{pe32_image, PeSectionSpec};
use std::io::Write;

use malsight::formats::{self, Format};
use malsight::report::{
    generated_timestamp, scale_entropy, DynamicRecord, FileRecord, FormatRecord, HashRecord,
    Report, StaticRecord,
};
use malsight::strings::StringsConfig;
use malsight::{entropy, hashing, io, signatures, strings};

const SIG_DB: &str = r#"[
    {"name": "marker", "category": "test", "hex": "4D 41 52 4B 45 52"}
]"#;

#[test]
fn static_pipeline_produces_a_complete_report() {
    // A PE with a recognizable string and a signature marker in .data.
    let mut image = pe32_image(
        0x800,
        &[PeSectionSpec {
            name: ".data",
            vaddr: 0x1000,
            vsize: 0x1000,
            rptr: 0x400,
            rsize: 0x100,
        }],
    );
    image[0x400..0x406].copy_from_slice(b"MARKER");
    image[0x410..0x420].copy_from_slice(b"visible-string\0\0");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.as_file_mut().write_all(&image).unwrap();

    let data = io::read_file_limited(file.path(), 1024 * 1024).unwrap();
    assert_eq!(data, image);

    let format = formats::detect(&data);
    assert_eq!(format, Format::Pe);

    let info = formats::pe::parse(&data).unwrap();
    assert!(info.valid);

    let sigs = signatures::load_signatures(SIG_DB).unwrap();
    let hits = signatures::match_signatures(&data, &sigs);
    assert_eq!(hits, vec!["marker".to_string()]);

    let extracted = strings::extract_strings(&data, &StringsConfig::default());
    assert!(extracted.iter().any(|s| s == "visible-string"));

    let report = Report {
        generated: generated_timestamp(),
        file: FileRecord {
            path: file.path().display().to_string(),
            size_bytes: data.len() as u64,
            format,
        },
        hashes: HashRecord {
            sha256: hashing::sha256_digest(&data),
        },
        static_analysis: StaticRecord {
            entropy_bpb: scale_entropy(entropy::shannon_entropy(&data)),
            signatures: hits,
            specific: FormatRecord::from(&info),
        },
        strings: extracted,
        dynamic: DynamicRecord { events: Vec::new() },
    };

    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["file"]["type"], "pe");
    assert_eq!(value["file"]["size_bytes"], 0x800);
    assert_eq!(value["hashes"]["sha256"].as_str().unwrap().len(), 64);
    assert_eq!(value["static"]["signatures"][0], "marker");
    assert_eq!(value["static"]["specific"]["sections"][0]["name"], ".data");
    assert!(value["static"]["specific"]["sections"][0]["entropy"].is_i64());
    assert!(value["static"]["entropy_bpb"].as_i64().unwrap() >= 0);
    assert!(value["dynamic"]["events"].as_array().unwrap().is_empty());

    // HTML emission embeds the same JSON blob.
    let html_path = file.path().with_extension("html");
    report.write_html(&html_path).unwrap();
    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("const report ="));
    assert!(html.contains("\"marker\""));
    std::fs::remove_file(&html_path).ok();
}

#[test]
fn oversized_input_is_refused_before_analysis() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.as_file_mut().write_all(&vec![0u8; 4096]).unwrap();
    assert!(io::read_file_limited(file.path(), 1024).is_err());
}

//! malsight CLI: static triage of an executable plus optional dynamic
//! syscall tracing, emitted as JSON and HTML reports.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};

use malsight::dynamic::{self, TraceOptions};
use malsight::formats::{self, Format};
use malsight::report::{
    generated_timestamp, scale_entropy, DynamicRecord, FileRecord, FormatRecord, HashRecord,
    Report, StaticRecord,
};
use malsight::strings::StringsConfig;
use malsight::{entropy, hashing, io, logging, signatures, strings};

#[derive(Parser)]
#[command(
    name = "malsight",
    about = "Static and dynamic triage evidence for untrusted executables",
    version
)]
struct Cli {
    /// File to analyze
    #[arg(long)]
    input: PathBuf,

    /// Write a JSON report to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write an HTML report to this path
    #[arg(long)]
    html: Option<PathBuf>,

    /// Signature database (JSON)
    #[arg(long, default_value = "configs/signatures.json")]
    sig: PathBuf,

    /// Trace the target's syscalls (Linux; run inside an isolated VM)
    #[arg(long)]
    dynamic: bool,

    /// Executable to trace instead of --input
    #[arg(long)]
    exec: Option<PathBuf>,

    /// Argument passed to the traced executable
    #[arg(long)]
    args: Option<String>,

    /// Minimum extracted string length
    #[arg(long, default_value_t = 6)]
    min_string: usize,

    /// Maximum extracted string length
    #[arg(long, default_value_t = 200)]
    max_string: usize,

    /// Skip ASCII string extraction
    #[arg(long)]
    no_ascii: bool,

    /// Skip UTF-16LE string extraction
    #[arg(long)]
    no_utf16: bool,

    /// Refuse input files larger than this many MiB
    #[arg(long, default_value_t = 128)]
    limit_mb: u64,

    /// Wall-clock limit for dynamic tracing, in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// More verbose diagnostics
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let data = match io::read_file_limited(&cli.input, cli.limit_mb * 1024 * 1024) {
        Ok(data) => data,
        Err(e) => {
            error!("failed to read {}: {e}", cli.input.display());
            return Ok(ExitCode::from(3));
        }
    };

    let sha256 = hashing::sha256_digest(&data);
    let format = formats::detect(&data);
    let entropy_bpb = entropy::shannon_entropy(&data);
    if entropy::chunk_entropy(&data, 4096).iter().any(|&e| e > 7.2) {
        debug!("high-entropy region present; possibly packed or encrypted content");
    }

    let strings_cfg = StringsConfig {
        min_len: cli.min_string,
        max_len: cli.max_string,
        ascii: !cli.no_ascii,
        utf16le: !cli.no_utf16,
    };
    let extracted = strings::extract_strings(&data, &strings_cfg);

    let sigs = match signatures::load_signatures_file(&cli.sig) {
        Ok(sigs) => sigs,
        Err(e) => {
            warn!("signature database {} unusable: {e}", cli.sig.display());
            Vec::new()
        }
    };
    let matches = signatures::match_signatures(&data, &sigs);

    let specific = match format {
        Format::Pe => formats::pe::parse(&data)
            .filter(|info| info.valid)
            .map(|info| FormatRecord::from(&info))
            .unwrap_or(FormatRecord::None {}),
        Format::Elf => formats::elf::parse(&data)
            .filter(|info| info.valid)
            .map(|info| FormatRecord::from(&info))
            .unwrap_or(FormatRecord::None {}),
        Format::Unknown => FormatRecord::None {},
    };

    let events = if cli.dynamic {
        warn!("dynamic analysis executes the target; run inside an isolated VM without network");
        let opts = TraceOptions {
            exec_path: cli.exec.clone().unwrap_or_else(|| cli.input.clone()),
            args: cli.args.clone().into_iter().collect(),
            timeout: Duration::from_secs(cli.timeout),
        };
        match dynamic::trace(&opts) {
            Ok(events) => events,
            Err(e) => {
                warn!("{e}");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let report = Report {
        generated: generated_timestamp(),
        file: FileRecord {
            path: cli.input.display().to_string(),
            size_bytes: data.len() as u64,
            format,
        },
        hashes: HashRecord {
            sha256: sha256.clone(),
        },
        static_analysis: StaticRecord {
            entropy_bpb: scale_entropy(entropy_bpb),
            signatures: matches,
            specific,
        },
        strings: extracted,
        dynamic: DynamicRecord { events },
    };

    if let Some(out) = &cli.out {
        report.write_json(out)?;
        info!("wrote JSON report to {}", out.display());
    }
    if let Some(html) = &cli.html {
        report.write_html(html)?;
        info!("wrote HTML report to {}", html.display());
    }

    println!(
        "sha256={} type={} size={} entropy={:.3} strings={}",
        sha256,
        format,
        data.len(),
        entropy_bpb,
        report.strings.len()
    );

    Ok(ExitCode::SUCCESS)
}

//! Conformance testing of the `vintage-x86` decoder against a reference corpus.
//!
//! The corpus is a directory of JSON files, one per opcode (`8B.json`, `0F01.json`, `F6.0.json`,
//! ...), each holding an array of `{ "name": ..., "bytes": [...] }` cases produced by a reference
//! disassembler. Every case is decoded with a fresh decoder; it passes when its bytes carry the
//! opcode (and group member) named by the file, the decoder completes, reports exactly `bytes.len()` bytes, does not reject the encoding, and renders the
//! same mnemonic the reference named.
//!
//! ## Environment variables
//!
//! When running via [`run_from_env`], the following environment variables are recognised:
//!
//! - `VINTAGE_X86_CORPUS_DIR` (required): directory holding the corpus files.
//! - `VINTAGE_X86_MODEL` (default: `8086`): CPU model to decode for.
//! - `VINTAGE_X86_FILTER` (optional): only check files whose stem contains one of these
//!   comma-separated substrings (case-insensitive).
//! - `VINTAGE_X86_REPORT_PATH` (optional): write a JSON conformance report to this path.

mod corpus;
mod error;
mod report;

pub use corpus::{load_dir, load_file, parse_stem, CorpusCase, CorpusFile};
pub use error::{CorpusError, Result};
pub use report::{ConformanceReport, FileSummary};

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use vintage_x86::{decode_one, DecodeResult, Model, Operation};

/// Failure samples kept in a report by default.
pub const DEFAULT_FAILURE_SAMPLES: usize = 32;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub corpus_dir: PathBuf,
    pub model: Model,
    /// Lower-case file-stem substrings; empty selects every file.
    pub filter: Vec<String>,
    pub report_path: Option<PathBuf>,
    pub max_failure_samples: usize,
}

impl RunConfig {
    pub fn new(corpus_dir: impl Into<PathBuf>, model: Model) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            model,
            filter: Vec::new(),
            report_path: None,
            max_failure_samples: DEFAULT_FAILURE_SAMPLES,
        }
    }
}

/// Why a corpus case did not match.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("decoder needs more than the {0} bytes given")]
    Incomplete(usize),
    #[error("rejected as undefined")]
    Undefined,
    #[error("decoded {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("encoding does not start with opcode {0}")]
    Opcode(String),
    #[error("decoded as {actual:?}, expected {expected:?}")]
    Mnemonic { expected: String, actual: String },
}

pub fn run_from_env() -> Result<ConformanceReport> {
    let corpus_dir = std::env::var_os("VINTAGE_X86_CORPUS_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(CorpusError::MissingCorpusDir)?;
    let model = match std::env::var("VINTAGE_X86_MODEL") {
        Ok(v) if !v.trim().is_empty() => v.parse::<Model>()?,
        _ => Model::I8086,
    };
    let filter = std::env::var("VINTAGE_X86_FILTER")
        .map(|v| parse_filter_terms(&v))
        .unwrap_or_default();
    let report_path = std::env::var_os("VINTAGE_X86_REPORT_PATH").map(PathBuf::from);

    run(&RunConfig {
        filter,
        report_path,
        ..RunConfig::new(corpus_dir, model)
    })
}

pub fn run(config: &RunConfig) -> Result<ConformanceReport> {
    let files = load_dir(&config.corpus_dir, &config.filter)?;
    let mut report = ConformanceReport::new(config.model.to_string(), config.max_failure_samples);

    for file in &files {
        info!(
            path = %file.path.display(),
            cases = file.cases.len(),
            "checking corpus file"
        );
        for case in &file.cases {
            let outcome = if file.covers(&case.bytes) {
                check_case(config.model, case)
            } else {
                Err(Mismatch::Opcode(file.stem.clone()))
            };
            report.record(&file.stem, case, outcome);
        }
    }

    if let Some(path) = &config.report_path {
        write_report(&report, path)?;
    }

    report.print_summary();
    Ok(report)
}

fn write_report(report: &ConformanceReport, path: &Path) -> Result<()> {
    report.write_json(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes one case and compares it with the reference.
pub fn check_case(model: Model, case: &CorpusCase) -> std::result::Result<(), Mismatch> {
    let (length, instruction) = match decode_one(model, &case.bytes) {
        DecodeResult::Complete {
            length,
            instruction,
        } => (length, instruction),
        DecodeResult::NeedMore { .. } => return Err(Mismatch::Incomplete(case.bytes.len())),
    };
    if instruction.is_undefined() {
        return Err(Mismatch::Undefined);
    }
    if length != case.bytes.len() {
        return Err(Mismatch::Length {
            expected: case.bytes.len(),
            actual: length,
        });
    }

    let expected = expected_mnemonic(&case.name);
    let actual = instruction.mnemonic();
    let matches = match instruction.operation() {
        // Coprocessor escapes are named by the coprocessor instruction they carry.
        Operation::Esc => expected.starts_with('f') || expected == "esc",
        _ => expected == actual,
    };
    if matches {
        Ok(())
    } else {
        Err(Mismatch::Mnemonic {
            expected,
            actual: actual.into_owned(),
        })
    }
}

const PREFIX_WORDS: [&str; 6] = ["lock", "rep", "repe", "repz", "repne", "repnz"];

const ALIASES: [(&str, &str); 22] = [
    ("jz", "je"),
    ("jnz", "jne"),
    ("jc", "jb"),
    ("jnae", "jb"),
    ("jnc", "jnb"),
    ("jae", "jnb"),
    ("jna", "jbe"),
    ("ja", "jnbe"),
    ("jpe", "jp"),
    ("jpo", "jnp"),
    ("jnge", "jl"),
    ("jge", "jnl"),
    ("jng", "jle"),
    ("jg", "jnle"),
    ("loopz", "loope"),
    ("loopnz", "loopne"),
    ("shl", "sal"),
    ("fwait", "wait"),
    ("xlatb", "xlat"),
    ("pushfw", "pushf"),
    ("popfw", "popf"),
    ("iretw", "iret"),
];

/// The mnemonic a reference name stands for, in this decoder's vocabulary.
///
/// Drops leading prefix words, folds synonyms, and turns `call far`/`jmp far` into the
/// `callf`/`jmpf` spelling.
pub fn expected_mnemonic(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let mut words = lower
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .skip_while(|w| PREFIX_WORDS.contains(w))
        .peekable();

    let Some(first) = words.next() else {
        return String::new();
    };
    if matches!(first, "call" | "jmp") && words.peek() == Some(&"far") {
        return format!("{first}f");
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == first)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or_else(|| first.to_string())
}

fn parse_filter_terms(filter: &str) -> Vec<String> {
    filter
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

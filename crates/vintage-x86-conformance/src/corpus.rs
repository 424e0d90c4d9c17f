//! On-disk reference corpus: one JSON file per opcode, each an array of cases.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CorpusError, Result};

/// One encoding and the assembly text the reference disassembler produced for it.
///
/// Corpus files usually carry more (initial/final CPU state, cycle traces); only these two
/// fields are read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CorpusCase {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub path: PathBuf,
    /// File name without `.json`, e.g. `0F01` or `F6.0`.
    pub stem: String,
    pub opcode: Vec<u8>,
    /// ModRM `reg` value for files split per group member.
    pub sub_opcode: Option<u8>,
    pub cases: Vec<CorpusCase>,
}

/// Bytes a reference encoding may carry ahead of its opcode.
const PREFIX_BYTES: [u8; 10] = [0x26, 0x2e, 0x36, 0x3e, 0x64, 0x65, 0x67, 0xf0, 0xf2, 0xf3];

impl CorpusFile {
    /// Whether `bytes` encodes this file's opcode (after any prefixes) and, for per-member
    /// files, carries the matching ModRM `reg` field.
    pub fn covers(&self, bytes: &[u8]) -> bool {
        let start = bytes
            .iter()
            .position(|b| !PREFIX_BYTES.contains(b))
            .unwrap_or(bytes.len());
        let Some(rest) = bytes[start..].strip_prefix(self.opcode.as_slice()) else {
            return false;
        };
        match self.sub_opcode {
            Some(reg) => rest.first().is_some_and(|modrm| (modrm >> 3) & 7 == reg),
            None => true,
        }
    }
}

/// Parses `8B`, `0F01` or `F6.3` into opcode bytes and an optional group sub-opcode.
pub fn parse_stem(stem: &str) -> Option<(Vec<u8>, Option<u8>)> {
    let (hex, sub) = match stem.split_once('.') {
        Some((hex, sub)) => (hex, Some(sub)),
        None => (stem, None),
    };
    if hex.is_empty() || hex.len() % 2 != 0 || hex.len() > 4 {
        return None;
    }
    let opcode = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    let sub_opcode = match sub {
        Some(sub) => Some(sub.parse::<u8>().ok().filter(|reg| *reg < 8)?),
        None => None,
    };
    Some((opcode, sub_opcode))
}

pub fn load_file(path: &Path) -> Result<CorpusFile> {
    let invalid_name = || CorpusError::InvalidFileName {
        path: path.to_path_buf(),
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(invalid_name)?
        .to_string();
    let (opcode, sub_opcode) = parse_stem(&stem).ok_or_else(invalid_name)?;

    let file = fs::File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cases: Vec<CorpusCase> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(CorpusFile {
        path: path.to_path_buf(),
        stem,
        opcode,
        sub_opcode,
        cases,
    })
}

/// Loads every `*.json` file in `dir` whose stem matches one of `terms` (all files when `terms`
/// is empty), in file-name order.
pub fn load_dir(dir: &Path, terms: &[String]) -> Result<Vec<CorpusFile>> {
    let io_err = |source| CorpusError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| stem_matches_filter(stem, terms))
            .unwrap_or(false);
        if stem_matches {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() && !terms.is_empty() {
        return Err(CorpusError::NoFilesMatched {
            dir: dir.to_path_buf(),
            filter: terms.join(","),
        });
    }

    paths.iter().map(|path| load_file(path)).collect()
}

fn stem_matches_filter(stem: &str, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let stem = stem.to_ascii_lowercase();
    terms.iter().any(|term| stem.contains(term.as_str()))
}

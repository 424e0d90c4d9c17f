use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::corpus::CorpusCase;
use crate::Mismatch;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub cases: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub model: String,
    pub total_cases: usize,
    pub failures: usize,
    pub files: BTreeMap<String, FileSummary>,
    /// The first few failures, rendered for humans.
    pub failure_samples: Vec<String>,
    #[serde(skip)]
    max_samples: usize,
}

impl ConformanceReport {
    pub fn new(model: impl Into<String>, max_samples: usize) -> Self {
        Self {
            model: model.into(),
            total_cases: 0,
            failures: 0,
            files: BTreeMap::new(),
            failure_samples: Vec::new(),
            max_samples,
        }
    }

    pub fn record(&mut self, file: &str, case: &CorpusCase, outcome: Result<(), Mismatch>) {
        self.total_cases += 1;
        let summary = self.files.entry(file.to_string()).or_default();
        summary.cases += 1;

        if let Err(mismatch) = outcome {
            summary.failures += 1;
            self.failures += 1;
            warn!(file, case = %case.name, bytes = ?case.bytes, %mismatch, "conformance mismatch");
            if self.failure_samples.len() < self.max_samples {
                self.failure_samples
                    .push(format!("{file}: {:?} {:02x?}: {mismatch}", case.name, case.bytes));
            }
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }

    pub fn print_summary(&self) {
        eprintln!(
            "conformance ({}): {} cases in {} files, {} failures",
            self.model,
            self.total_cases,
            self.files.len(),
            self.failures
        );

        let failing: Vec<_> = self
            .files
            .iter()
            .filter(|(_, summary)| summary.failures > 0)
            .collect();
        if !failing.is_empty() {
            eprintln!("failing files:");
            for (file, summary) in failing {
                eprintln!("  - {file}: {}/{}", summary.failures, summary.cases);
            }
        }
        for sample in &self.failure_samples {
            eprintln!("  {sample}");
        }
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, contents)
    }
}

#![cfg(not(target_arch = "wasm32"))]

use std::fs;
use std::path::Path;

use vintage_x86::Model;
use vintage_x86_conformance::{run, CorpusError, Mismatch, RunConfig};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn synthetic_corpus(dir: &Path) {
    write(
        dir,
        "B8.json",
        r#"[
            {"name": "mov ax, 1234h", "bytes": [184, 52, 18], "initial": {"regs": {}}, "final": {}},
            {"name": "mov ax, 0FFFFh", "bytes": [184, 255, 255]}
        ]"#,
    );
    write(
        dir,
        "74.json",
        r#"[{"name": "jz short 0000h", "bytes": [116, 254]}]"#,
    );
    write(
        dir,
        "F6.3.json",
        r#"[{"name": "neg byte [bx+si]", "bytes": [246, 24]}]"#,
    );
    write(
        dir,
        "0F01.json",
        r#"[{"name": "smsw ax", "bytes": [15, 1, 224]}]"#,
    );
    write(dir, "README.md", "not a corpus file");
}

#[test]
fn clean_corpus_passes() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_corpus(dir.path());

    let report = run(&RunConfig::new(dir.path(), Model::I80286)).unwrap();
    assert_eq!(report.total_cases, 5);
    assert_eq!(report.files.len(), 4);
    assert!(report.is_clean(), "{:?}", report.failure_samples);
}

#[test]
fn model_gating_shows_up_as_failures() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_corpus(dir.path());

    let report = run(&RunConfig::new(dir.path(), Model::I8086)).unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.files["0F01"].failures, 1);
    assert!(report.failure_samples[0].contains(&Mismatch::Undefined.to_string()));
}

#[test]
fn mismatches_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "40.json",
        r#"[{"name": "dec ax", "bytes": [64]}, {"name": "inc ax", "bytes": [64]}]"#,
    );
    write(dir.path(), "90.json", r#"[{"name": "nop", "bytes": [144, 144]}]"#);

    let report_path = dir.path().join("report.json");
    let config = RunConfig {
        report_path: Some(report_path.clone()),
        ..RunConfig::new(dir.path(), Model::I8086)
    };
    let report = run(&config).unwrap();
    assert_eq!(report.total_cases, 3);
    assert_eq!(report.failures, 2);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["failures"], 2);
    assert_eq!(json["files"]["40"]["cases"], 2);
    assert_eq!(json["model"], "8086");
}

#[test]
fn filter_selects_files_by_stem() {
    let dir = tempfile::tempdir().unwrap();
    synthetic_corpus(dir.path());

    let config = RunConfig {
        filter: vec!["b8".to_string(), "f6".to_string()],
        ..RunConfig::new(dir.path(), Model::I8086)
    };
    let report = run(&config).unwrap();
    assert_eq!(
        report.files.keys().cloned().collect::<Vec<_>>(),
        vec!["B8".to_string(), "F6.3".to_string()]
    );

    let config = RunConfig {
        filter: vec!["ff".to_string()],
        ..RunConfig::new(dir.path(), Model::I8086)
    };
    assert!(matches!(run(&config), Err(CorpusError::NoFilesMatched { .. })));
}

#[test]
fn malformed_corpus_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "90.json", r#"{"name": "nop"}"#);
    let err = run(&RunConfig::new(dir.path(), Model::I8086)).unwrap_err();
    assert!(matches!(err, CorpusError::Json { .. }), "{err}");

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "nop.json", "[]");
    let err = run(&RunConfig::new(dir.path(), Model::I8086)).unwrap_err();
    assert!(matches!(err, CorpusError::InvalidFileName { .. }), "{err}");

    let err = run(&RunConfig::new(dir.path().join("missing"), Model::I8086)).unwrap_err();
    assert!(matches!(err, CorpusError::Io { .. }), "{err}");
}

#[test]
fn cases_filed_under_the_wrong_opcode_fail() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "F6.3.json",
        r#"[
            {"name": "neg bl", "bytes": [246, 219]},
            {"name": "not bl", "bytes": [246, 211]},
            {"name": "neg word [bx]", "bytes": [247, 31]}
        ]"#,
    );

    let report = run(&RunConfig::new(dir.path(), Model::I8086)).unwrap();
    assert_eq!(report.total_cases, 3);
    assert_eq!(report.failures, 2);
    let wrong = Mismatch::Opcode("F6.3".to_string()).to_string();
    assert!(
        report.failure_samples.iter().all(|s| s.contains(&wrong)),
        "{:?}",
        report.failure_samples
    );
}

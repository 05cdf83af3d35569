//! Smoke tests for the `medassist` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("anemia.txt"),
        "Fatigue is a symptom of anemia.\n\nPallor and shortness of breath are also common.",
    )
    .unwrap();
    fs::write(
        docs.join("iron.txt"),
        "Serum ferritin is the best single test for iron stores.",
    )
    .unwrap();

    let config_content = format!(
        r#"[chunking]
chunk_size = 500
overlap = 50

[retrieval]
top_k = 3
log_path = "{root}/logs/retrieval_log.jsonl"

[embedding]
provider = "hashing"
dims = 128

[index]
backend = "sqlite"
path = "{root}/data/medassist.sqlite"
dims = 128

[ingest]
dirs = ["{root}/docs"]
"#,
        root = root.display()
    );

    let config_path = root.join("medassist.toml");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_medassist"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .expect("failed to run medassist binary");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_ingest_then_search() {
    let (tmp, config) = setup_test_env();

    let (stdout, stderr, ok) = run(&config, &["ingest"]);
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("pages extracted: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("index: created"));

    let (stdout, stderr, ok) = run(&config, &["search", "what is fatigue", "--top-k", "1"]);
    assert!(ok, "search failed: {}", stderr);
    assert!(stdout.contains("1. ["), "stdout: {}", stdout);
    assert!(stdout.contains("anemia.txt (page 1)"));
    assert!(stdout.contains("[Source 1: anemia.txt, Page 1]"));

    let log = fs::read_to_string(tmp.path().join("logs/retrieval_log.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn test_reingest_reports_existing_index() {
    let (_tmp, config) = setup_test_env();
    assert!(run(&config, &["ingest"]).2);
    let (stdout, _, ok) = run(&config, &["ingest"]);
    assert!(ok);
    assert!(stdout.contains("index: existing"));
}

#[test]
fn test_ingest_single_file() {
    let (tmp, config) = setup_test_env();
    let file = tmp.path().join("docs/iron.txt");
    let (stdout, stderr, ok) = run(&config, &["ingest", "--file", file.to_str().unwrap()]);
    assert!(ok, "ingest failed: {}", stderr);
    assert!(stdout.contains("pages extracted: 1"));
}

#[test]
fn test_ingest_empty_dir_fails() {
    let (tmp, config) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir(&empty).unwrap();
    let (_, stderr, ok) = run(&config, &["ingest", "--dir", empty.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("No documents found"));
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[chunking]\nchunk_size = 100\noverlap = 200\n").unwrap();
    let (_, stderr, ok) = run(&config, &["search", "anything"]);
    assert!(!ok);
    assert!(stderr.contains("overlap"));
}

#[test]
fn test_search_before_ingest_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run(&config, &["search", "what is fatigue"]);
    assert!(!ok);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn chunkvec_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chunkvec");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.",
    )
    .unwrap();
    fs::write(
        files_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nContains notes about deployment and infrastructure.",
    )
    .unwrap();

    let config_content = format!(
        r#"[store]
backend = "sqlite"
path = "{}/data/chunkvec.sqlite"

[embedding]
provider = "disabled"
dims = 8

[chunking]
chunk_size = 40
overlap = 10

[server]
bind = "127.0.0.1:7341"
"#,
        root.display()
    );

    let config_path = config_dir.join("chunkvec.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_chunkvec(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chunkvec_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chunkvec binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_chunkvec(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(stdout.contains("8 dims"));
    assert!(tmp.path().join("data").join("chunkvec.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_chunkvec(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, stderr, success2) = run_chunkvec(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent): {}", stderr);
}

#[test]
fn test_init_rejects_dimensionality_change() {
    let (_tmp, config_path) = setup_test_env();
    run_chunkvec(&config_path, &["init"]);

    let content = fs::read_to_string(&config_path).unwrap();
    fs::write(&config_path, content.replace("dims = 8", "dims = 16")).unwrap();

    let (_, stderr, success) = run_chunkvec(&config_path, &["init"]);
    assert!(!success, "init with a different dimensionality should fail");
    assert!(stderr.contains("schema error"), "stderr: {}", stderr);
}

#[test]
fn test_list_empty_store() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_chunkvec(&config_path, &["list"]);
    assert!(success);
    assert!(stdout.contains("No records."));
}

#[test]
fn test_stats_reports_backend_and_count() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_chunkvec(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("sqlite"));
    assert!(stdout.contains("Records:     0"));
    assert!(stdout.contains("Dimensions:  8"));
}

#[test]
fn test_search_empty_query_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_chunkvec(&config_path, &["search", "   "]);
    assert!(!success, "Blank query should fail");
    assert!(stderr.contains("query must not be empty"), "stderr: {}", stderr);
}

#[test]
fn test_search_errors_when_provider_disabled() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_chunkvec(&config_path, &["search", "deployment"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_file_fails_when_provider_disabled() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("alpha.md");

    let (_, stderr, success) = run_chunkvec(&config_path, &["ingest", file.to_str().unwrap()]);
    assert!(!success, "Ingest with disabled provider should fail");
    assert!(stderr.contains("embedding provider error"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_directory_reports_partial_failure() {
    let (tmp, config_path) = setup_test_env();
    let dir = tmp.path().join("files");

    let (stdout, stderr, success) = run_chunkvec(&config_path, &["ingest", dir.to_str().unwrap()]);
    assert!(!success);
    assert!(stdout.contains("files: 0/2"), "stdout: {}", stdout);
    assert!(stderr.contains("0/2 files succeeded"), "stderr: {}", stderr);

    let (stdout, _, _) = run_chunkvec(&config_path, &["list"]);
    assert!(stdout.contains("No records."), "nothing should be stored");
}

#[test]
fn test_ingest_rejects_invalid_chunking() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("gamma.txt");

    let (_, stderr, success) = run_chunkvec(
        &config_path,
        &["ingest", file.to_str().unwrap(), "--chunk-size", "10", "--overlap", "10"],
    );
    assert!(!success);
    assert!(stderr.contains("invalid chunking"), "stderr: {}", stderr);
}

#[test]
fn test_ingest_empty_file_errors() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("empty.txt");
    fs::write(&file, "  \n ").unwrap();

    let (_, stderr, success) = run_chunkvec(&config_path, &["ingest", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("no content"), "stderr: {}", stderr);
}

#[test]
fn test_embed_rejects_blank_text() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_chunkvec(&config_path, &["embed", " "]);
    assert!(!success);
    assert!(stderr.contains("text must not be empty"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config_errors() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_chunkvec(&missing, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

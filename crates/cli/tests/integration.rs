//! Integration tests for the s3sync CLI
//!
//! These tests require a running S3-compatible server with an existing,
//! empty bucket.
//!
//! Run with:
//! ```bash
//! # Start RustFS container
//! docker run -d --name rustfs -p 9000:9000 -p 9001:9001 \
//!     -v rustfs-data:/data \
//!     -e RUSTFS_ACCESS_KEY=accesskey \
//!     -e RUSTFS_SECRET_KEY=secretkey \
//!     rustfs/rustfs:1.0.0-alpha.81
//!
//! # Create the bucket, then run tests
//! TEST_S3_ENDPOINT=http://localhost:9000 TEST_S3_ACCESS_KEY=accesskey \
//!     TEST_S3_SECRET_KEY=secretkey TEST_S3_BUCKET=s3sync-test \
//!     cargo test --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Get the path to the s3sync binary
fn s3sync_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_s3sync"))
}

/// Connection settings from the environment
struct TestServer {
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
}

fn test_server() -> Option<TestServer> {
    Some(TestServer {
        endpoint: std::env::var("TEST_S3_ENDPOINT").ok()?,
        access_key: std::env::var("TEST_S3_ACCESS_KEY").ok()?,
        secret_key: std::env::var("TEST_S3_SECRET_KEY").ok()?,
        bucket: std::env::var("TEST_S3_BUCKET").ok()?,
    })
}

/// Generate unique suffix for test resources
fn uuid_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:x}", duration.as_nanos() % 0xFFFFFFFF)
}

/// Write a config file pointing at the test server
fn write_config(dir: &Path, server: &TestServer) -> PathBuf {
    let path = dir.join("s3sync.toml");
    let content = format!(
        r#"schema_version = 1

[connection]
region = "us-east-1"
endpoint = "{}"
access_key = "{}"
secret_key = "{}"
force_path_style = true
"#,
        server.endpoint, server.access_key, server.secret_key
    );
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

/// Run s3sync with the given config file
fn run_s3sync(args: &[&str], config: &Path) -> Output {
    Command::new(s3sync_binary())
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute s3sync command")
}

fn sync_json(config: &Path, bucket: &str, source: &Path, extra: &[&str]) -> Value {
    let source = source.to_string_lossy().to_string();
    let mut args = vec!["--json", "sync", "--bucket", bucket, "--source", &source];
    args.extend_from_slice(extra);

    let output = run_s3sync(&args, config);
    assert!(
        output.status.success(),
        "sync failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("Invalid JSON output")
}

fn keys(report: &Value, field: &str) -> Vec<String> {
    let mut keys: Vec<String> = report[field]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    keys.sort();
    keys
}

/// Source tree whose keys live under a unique prefix
fn source_tree() -> (TempDir, String) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let prefix = format!("site-{}", uuid_suffix());
    let root = dir.path().join(&prefix);
    std::fs::create_dir_all(root.join("css")).unwrap();
    std::fs::write(root.join("index.html"), "<h1>hello</h1>").unwrap();
    std::fs::write(root.join("css/site.css"), "body {}").unwrap();
    (dir, prefix)
}

// Cleanup is bucket-wide, so the whole lifecycle runs in one test
#[test]
fn test_sync_lifecycle() {
    let Some(server) = test_server() else {
        eprintln!("Skipping: TEST_S3_* not set");
        return;
    };
    let config_dir = TempDir::new().unwrap();
    let config = write_config(config_dir.path(), &server);
    let (dir, prefix) = source_tree();
    let index = format!("{prefix}/index.html");
    let css = format!("{prefix}/css/site.css");

    let first = sync_json(&config, &server.bucket, dir.path(), &[]);
    assert_eq!(keys(&first["targets"][0]["walk"], "changed"), vec![css.clone(), index.clone()]);

    let second = sync_json(&config, &server.bucket, dir.path(), &[]);
    let walk = &second["targets"][0]["walk"];
    assert!(keys(walk, "changed").is_empty());
    assert_eq!(keys(walk, "skipped"), vec![css.clone(), index.clone()]);

    std::fs::remove_file(dir.path().join(&prefix).join("css/site.css")).unwrap();
    let third = sync_json(&config, &server.bucket, dir.path(), &["--cleanup"]);
    let removed = keys(&third["targets"][0]["reconcile"], "removed");
    assert!(removed.contains(&css));
    assert!(!removed.contains(&index));

    // Leave the bucket as we found it
    std::fs::remove_file(dir.path().join(&prefix).join("index.html")).unwrap();
    sync_json(&config, &server.bucket, dir.path(), &["--cleanup"]);
}

#[test]
fn test_unknown_target_is_not_found() {
    let Some(server) = test_server() else {
        eprintln!("Skipping: TEST_S3_* not set");
        return;
    };
    let config_dir = TempDir::new().unwrap();
    let config = write_config(config_dir.path(), &server);

    let output = run_s3sync(&["sync", "--target", "no-such-target"], &config);
    assert_eq!(output.status.code(), Some(5));
}

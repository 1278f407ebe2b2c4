//! Integration tests for depcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn depcache() -> Command {
        let mut cmd = cargo_bin_cmd!("depcache");
        cmd.env_remove("DEPCACHE_CONFIG")
            .env_remove("DEPCACHE_TIMEOUT")
            .env_remove("DEPCACHE_RETRIES")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write_config(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("depcache.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        depcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Dependency cache synchronizer"));
    }

    #[test]
    fn version_flag_displays() {
        depcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depcache"));
    }

    #[test]
    fn version_command_needs_no_config() {
        let dir = TempDir::new().unwrap();
        depcache()
            .current_dir(dir.path())
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::starts_with("depcache "));
    }

    #[test]
    fn unknown_command_fails() {
        depcache().arg("sync").assert().failure();
    }

    #[test]
    fn missing_config_fails() {
        let dir = TempDir::new().unwrap();
        depcache()
            .current_dir(dir.path())
            .args(["status", "--config"])
            .arg(dir.path().join("absent.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn malformed_config_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "{ not json");
        depcache()
            .arg("status")
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn empty_cache_list_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            r#"{"s3": {"bucket": "b", "region": "us-east-1"}, "cache": []}"#,
        );
        depcache()
            .arg("upload")
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache entries configured"));
    }

    #[test]
    fn missing_bucket_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            r#"{
                "s3": {"region": "us-east-1"},
                "cache": [{"manifest": "Gemfile.lock", "path": "vendor", "prefix": "gems"}]
            }"#,
        );
        depcache()
            .arg("download")
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("s3.bucket is not set"));
    }

    #[test]
    fn local_config_is_discovered() {
        let dir = TempDir::new().unwrap();
        write_config(
            dir.path(),
            r#"{"s3": {"bucket": "b", "region": "us-east-1"}, "cache": []}"#,
        );
        depcache()
            .current_dir(dir.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache entries configured"));
    }

    #[test]
    fn invalid_entries_fail_without_network() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            r#"{
                "s3": {
                    "key": "AKIDEXAMPLE",
                    "secret": "secret",
                    "region": "us-east-1",
                    "bucket": "depcache-test",
                    "endpoint": "http://127.0.0.1:9"
                },
                "cache": [
                    {"manifest": "Gemfile.lock", "path": "vendor", "prefix": "gems",
                     "download_policy": "always"},
                    {"manifest": "missing.lock", "path": "node_modules", "prefix": "node"}
                ]
            }"#,
        );
        depcache()
            .current_dir(dir.path())
            .arg("download")
            .arg("--format")
            .arg("json")
            .arg("--config")
            .arg(&config)
            .arg("--scratch-dir")
            .arg(dir.path().join("scratch"))
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""status": "failed""#))
            .stdout(predicate::str::contains(r#""prefix": "gems""#))
            .stdout(predicate::str::contains(r#""prefix": "node""#))
            .stderr(predicate::str::contains("2 of 2 cache entries failed"));
    }
}

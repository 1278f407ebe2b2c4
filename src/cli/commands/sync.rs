//! Sync commands - status, upload, download and reset

use crate::cli::args::{Cli, OutputFormat};
use crate::config::ConfigManager;
use crate::error::{DepCacheError, DepCacheResult};
use crate::store::{CallPolicy, GuardedStore, S3Store};
use crate::sync::{EntryReport, Operation, Outcome, RunReport, SyncEngine};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Execute a sync operation for every configured cache entry
///
/// Setup failures (config, credentials, scratch directory) abort before any
/// entry runs. After that every entry runs to completion and the command
/// fails only if at least one entry did.
pub async fn execute(operation: Operation, cli: &Cli) -> DepCacheResult<()> {
    let manager = ConfigManager::discover(cli.config.clone());
    debug!("Using config {}", manager.path().display());
    let config = manager.load().await?;
    config.validate()?;

    let scratch_dir = cli.scratch_dir.clone().unwrap_or_else(std::env::temp_dir);
    fs::create_dir_all(&scratch_dir).await.map_err(|e| {
        DepCacheError::io(
            format!("creating scratch directory {}", scratch_dir.display()),
            e,
        )
    })?;

    let store = S3Store::connect(&config.s3).await?;
    let store = GuardedStore::new(Arc::new(store), CallPolicy::new(cli.timeout, cli.retries));
    let engine = SyncEngine::new(store, scratch_dir);

    let report = engine.run(operation, &config.cache).await;
    match cli.format {
        OutputFormat::Text => print_report_text(&report),
        OutputFormat::Json => print_report_json(&report)?,
    }

    report.into_result()
}

fn print_report_text(report: &RunReport) {
    println!();
    for entry in report.entries() {
        let status = match &entry.result {
            Ok(Outcome::Skipped(reason)) => {
                format!("{} ({})", style("skipped").dim(), reason)
            }
            Ok(Outcome::Missing) => style("missing").yellow().to_string(),
            Ok(outcome) => style(outcome.label()).green().to_string(),
            Err(e) => format!("{} ({}: {})", style("failed").red(), e.category(), e),
        };
        println!("  {} {}", style(entry.label()).bold(), status);
    }

    let failed = report.failed_count();
    let total = report.entries().len();
    println!();
    if failed == 0 {
        println!("{} {} cache(s) processed", style("✓").green(), total);
    } else {
        println!(
            "{} {} of {} cache(s) failed",
            style("✗").red(),
            failed,
            total
        );
    }
}

#[derive(Serialize)]
struct EntryJson {
    prefix: String,
    manifest: PathBuf,
    path: PathBuf,
    key: Option<String>,
    status: &'static str,
    detail: Option<String>,
}

impl From<&EntryReport> for EntryJson {
    fn from(entry: &EntryReport) -> Self {
        let (status, detail) = match &entry.result {
            Ok(Outcome::Skipped(reason)) => ("skipped", Some(reason.to_string())),
            Ok(outcome) => (outcome.label(), None),
            Err(e) => ("failed", Some(e.to_string())),
        };
        Self {
            prefix: entry.prefix.clone(),
            manifest: entry.manifest.clone(),
            path: entry.path.clone(),
            key: entry.key.clone(),
            status,
            detail,
        }
    }
}

fn report_json(report: &RunReport) -> DepCacheResult<String> {
    let entries: Vec<EntryJson> = report.entries().iter().map(EntryJson::from).collect();
    serde_json::to_string_pretty(&entries)
        .map_err(|e| DepCacheError::Internal(format!("serializing report: {}", e)))
}

fn print_report_json(report: &RunReport) -> DepCacheResult<()> {
    println!("{}", report_json(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SkipReason;

    fn sample_report() -> RunReport {
        RunReport::new(vec![
            EntryReport {
                prefix: "gems".to_string(),
                manifest: PathBuf::from("Gemfile.lock"),
                path: PathBuf::from("vendor/bundle"),
                key: Some("gems_ab_linux_amd64.tar.gz".to_string()),
                result: Ok(Outcome::Skipped(SkipReason::AlreadyUploaded)),
            },
            EntryReport {
                prefix: "node".to_string(),
                manifest: PathBuf::from("yarn.lock"),
                path: PathBuf::from("node_modules"),
                key: None,
                result: Err(DepCacheError::InvalidDownloadPolicy {
                    value: "always".to_string(),
                }),
            },
        ])
    }

    #[test]
    fn json_report_shape() {
        let json = report_json(&sample_report()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed[0]["prefix"], "gems");
        assert_eq!(parsed[0]["key"], "gems_ab_linux_amd64.tar.gz");
        assert_eq!(parsed[0]["status"], "skipped");
        assert_eq!(parsed[0]["detail"], "already uploaded");
        assert_eq!(parsed[1]["status"], "failed");
        assert!(parsed[1]["key"].is_null());
        assert!(parsed[1]["detail"]
            .as_str()
            .unwrap()
            .contains("Invalid download policy"));
    }

    #[test]
    fn text_report_does_not_panic() {
        print_report_text(&sample_report());
        print_report_text(&RunReport::default());
    }
}

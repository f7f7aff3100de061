//! CLI integration tests.
//!
//! Tests cover:
//! - Argument parsing for every subcommand
//! - Config loading and validation failures
//! - Full command runs against an on-disk SQLite database and CSV exports

use clap::Parser;
use resale_ledger::cli::{self, Cli, Command};
use resale_ledger::domain::error::LedgerError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let candidates = dir.path().join("candidates");
        fs::create_dir(&candidates).unwrap();
        let config = dir.path().join("ledger.ini");
        fs::write(
            &config,
            format!(
                "[database]\npath = {}\npool_size = 2\n\n[source]\ncandidates_dir = {}\n\n[logging]\nlevel = warn\n",
                dir.path().join("ledger.db").display(),
                candidates.display()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn write_query(&self, query_id: &str, rows: &str) {
        fs::write(
            self.dir.path().join("candidates").join(format!("{query_id}.csv")),
            format!("id,title,brand,size,price,url,photos,country,created_at\n{rows}"),
        )
        .unwrap();
    }

    fn run(&self, args: &[&str]) -> Result<String, LedgerError> {
        cli::execute(&parse(&self.config, args))
    }
}

fn parse(config: &Path, args: &[&str]) -> Cli {
    let mut argv = vec!["resale-ledger", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

mod parsing {
    use super::*;

    #[test]
    fn sync_requires_query() {
        assert!(Cli::try_parse_from(["resale-ledger", "--config", "x.ini", "sync"]).is_err());
        let cli = parse(Path::new("x.ini"), &["sync", "--query", "trainers"]);
        assert!(matches!(cli.command, Command::Sync { ref query } if query == "trainers"));
    }

    #[test]
    fn stats_range_needs_both_ends() {
        assert!(
            Cli::try_parse_from(["resale-ledger", "-c", "x.ini", "stats", "--from", "2024-01-01"])
                .is_err()
        );
        let cli = parse(
            Path::new("x.ini"),
            &["stats", "--from", "2024-01-01", "--to", "2024-01-31"],
        );
        assert!(matches!(cli.command, Command::Stats { from: Some(_), to: Some(_) }));
    }

    #[test]
    fn config_is_required() {
        assert!(Cli::try_parse_from(["resale-ledger", "init-db"]).is_err());
    }

    #[test]
    fn json_flag() {
        let cli = parse(Path::new("x.ini"), &["--json", "events"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Events { limit: 20 }));
    }
}

mod config_errors {
    use super::*;

    #[test]
    fn missing_config_file() {
        let err = cli::execute(&parse(Path::new("/nonexistent/ledger.ini"), &["init-db"]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConfigParse { .. }));
    }

    #[test]
    fn missing_database_path() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("ledger.ini");
        fs::write(&config, "[logging]\nlevel = info\n").unwrap();
        let err = cli::execute(&parse(&config, &["init-db"])).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigMissing { ref key, .. } if key == "path"));
    }

    #[test]
    fn sync_without_candidates_dir() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("ledger.ini");
        fs::write(
            &config,
            format!("[database]\npath = {}\n", dir.path().join("l.db").display()),
        )
        .unwrap();
        cli::execute(&parse(&config, &["integration", "enable"])).unwrap();
        let err = cli::execute(&parse(&config, &["sync", "--query", "q"])).unwrap_err();
        assert!(matches!(err, LedgerError::ConfigMissing { ref key, .. } if key == "candidates_dir"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn init_db_creates_database_file() {
        let ws = Workspace::new();
        let out = ws.run(&["init-db"]).unwrap();
        assert!(out.starts_with("database ready"));
        assert!(ws.dir.path().join("ledger.db").exists());
    }

    #[test]
    fn seed_then_items_and_stats() {
        let ws = Workspace::new();
        let out = ws.run(&["seed"]).unwrap();
        assert_eq!(out, "created 6 items, 2 sales, 4 tasks, 1 returns");

        let listed = ws.run(&["items", "--status", "listed"]).unwrap();
        assert_eq!(listed.lines().count(), 3);
        assert!(listed.contains("VINT-PUM-006"));

        let json = ws.run(&["--json", "items", "--brand", "nike"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["sku"], "VINT-NIK-001");
        assert_eq!(parsed[0]["profit"], "31.50");

        let stats = ws.run(&["--json", "stats"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&stats).unwrap();
        assert_eq!(parsed["items"]["total"], 6);
        assert_eq!(parsed["sales"]["count"], 2);
        assert!(parsed.get("range").is_none());
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let ws = Workspace::new();
        let err = ws.run(&["items", "--status", "lost"]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn sync_requires_enabled_integration() {
        let ws = Workspace::new();
        ws.write_query("trainers", "123,Nike Air Max,Nike,UK 9,35.00,,,,\n");

        let err = ws.run(&["sync", "--query", "trainers"]).unwrap_err();
        assert!(matches!(err, LedgerError::IntegrationDisabled));

        ws.run(&["integration", "enable"]).unwrap();
        let out = ws.run(&["sync", "--query", "trainers"]).unwrap();
        assert_eq!(out, "query trainers: 1 imported, 0 skipped, 0 errors");

        let again = ws.run(&["sync", "--query", "trainers"]).unwrap();
        assert_eq!(again, "query trainers: 0 imported, 1 skipped, 0 errors");

        let drafts = ws.run(&["items", "--status", "Draft"]).unwrap();
        assert!(drafts.contains("VINT-NIKE-123"));

        let status = ws.run(&["--json", "integration", "status"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(parsed["enabled"], true);
        assert!(!parsed["last_sync"].is_null());
    }

    #[test]
    fn sync_of_missing_export_is_source_unavailable() {
        let ws = Workspace::new();
        ws.run(&["integration", "enable"]).unwrap();
        let err = ws.run(&["sync", "--query", "nothing"]).unwrap_err();
        assert!(matches!(err, LedgerError::SourceUnavailable { .. }));

        let events = ws.run(&["events", "--limit", "1"]).unwrap();
        assert!(events.contains("query_sync"));
        assert!(events.contains("Error"));
    }

    #[test]
    fn sync_of_path_like_query_is_a_validation_error() {
        let ws = Workspace::new();
        ws.run(&["integration", "enable"]).unwrap();
        let err = ws.run(&["sync", "--query", "../ledger"]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        assert_eq!(ExitCode::from(&err), ExitCode::from(4));
    }

    #[test]
    fn connection_test_reports_count() {
        let ws = Workspace::new();
        ws.write_query("q", "1,Tee,,,5,,,,\n2,Hoodie,,,9,,,,\n");
        let out = ws.run(&["integration", "test", "--query", "q"]).unwrap();
        assert_eq!(out, "query q: 2 candidates available");
    }

    #[test]
    fn settings_set_and_list() {
        let ws = Workspace::new();
        let out = ws.run(&["settings", "set", "vinted_fee_percent", "7.5"]).unwrap();
        assert_eq!(out, "vinted_fee_percent = 7.5");

        let listing = ws.run(&["settings", "list"]).unwrap();
        assert!(listing.contains("vinted_fee_percent = 7.5"));
        assert!(listing.contains("vinted_integration_enabled = false"));

        let err = ws.run(&["settings", "set", "no_such_key", "1"]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
        let err = ws.run(&["settings", "set", "vinted_fee_percent", "-3"]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn stats_with_inverted_range_fails() {
        let ws = Workspace::new();
        let err = ws
            .run(&["stats", "--from", "2024-02-01", "--to", "2024-01-01"])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }
}

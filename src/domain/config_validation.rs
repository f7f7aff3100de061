//! Application configuration validation.
//!
//! Checks every config field up front so commands fail before touching the
//! database.

use std::path::PathBuf;

use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_POOL_SIZE: i64 = 4;
pub const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validated process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: String,
    pub pool_size: u32,
    pub candidates_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

pub fn validate_app_config(config: &dyn ConfigPort) -> Result<AppConfig, LedgerError> {
    Ok(AppConfig {
        database_path: validate_database_path(config)?,
        pool_size: validate_pool_size(config)?,
        candidates_dir: config.get_string("source", "candidates_dir").map(PathBuf::from),
        log_level: validate_log_level(config)?,
        log_json: config.get_bool("logging", "json", false),
    })
}

fn validate_database_path(config: &dyn ConfigPort) -> Result<String, LedgerError> {
    config
        .get_string("database", "path")
        .ok_or_else(|| LedgerError::ConfigMissing {
            section: "database".to_string(),
            key: "path".to_string(),
        })
}

fn validate_pool_size(config: &dyn ConfigPort) -> Result<u32, LedgerError> {
    let value = config.get_int("database", "pool_size", DEFAULT_POOL_SIZE);
    u32::try_from(value)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| LedgerError::ConfigInvalid {
            section: "database".to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be a positive integer".to_string(),
        })
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<String, LedgerError> {
    let level = config
        .get_string("logging", "level")
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(LedgerError::ConfigInvalid {
            section: "logging".to_string(),
            key: "level".to_string(),
            reason: format!("level must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[database]
path = ledger.db
pool_size = 2

[source]
candidates_dir = exports

[logging]
level = DEBUG
json = true
"#,
        );
        let app = validate_app_config(&config).unwrap();
        assert_eq!(app.database_path, "ledger.db");
        assert_eq!(app.pool_size, 2);
        assert_eq!(app.candidates_dir, Some(PathBuf::from("exports")));
        assert_eq!(app.log_level, "debug");
        assert!(app.log_json);
    }

    #[test]
    fn defaults_apply() {
        let app = validate_app_config(&make_config("[database]\npath = ledger.db\n")).unwrap();
        assert_eq!(app.pool_size, 4);
        assert_eq!(app.log_level, "info");
        assert!(!app.log_json);
        assert_eq!(app.candidates_dir, None);
    }

    #[test]
    fn database_path_required() {
        let err = validate_app_config(&make_config("[database]\npool_size = 2\n")).unwrap_err();
        assert!(
            matches!(err, LedgerError::ConfigMissing { section, key } if section == "database" && key == "path")
        );
    }

    #[test]
    fn pool_size_must_be_positive() {
        let err = validate_app_config(&make_config("[database]\npath = x.db\npool_size = 0\n"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConfigInvalid { key, .. } if key == "pool_size"));
    }

    #[test]
    fn unknown_log_level_fails() {
        let err = validate_app_config(&make_config(
            "[database]\npath = x.db\n[logging]\nlevel = loud\n",
        ))
        .unwrap_err();
        assert!(matches!(err, LedgerError::ConfigInvalid { key, .. } if key == "level"));
    }
}

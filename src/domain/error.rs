//! Ledger error taxonomy.

/// Top-level error type for the ledger.
///
/// Validation, transition, conflict and not-found errors describe a rejected
/// request and are always surfaced to the caller. The remaining variants are
/// infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("integration is disabled")]
    IntegrationDisabled,

    #[error("candidate source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Database { .. }
            | LedgerError::DatabaseQuery { .. }
            | LedgerError::Serialization(_) => 3,
            LedgerError::Validation { .. }
            | LedgerError::InvalidTransition { .. }
            | LedgerError::Conflict { .. }
            | LedgerError::NotFound { .. } => 4,
            LedgerError::IntegrationDisabled | LedgerError::SourceUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

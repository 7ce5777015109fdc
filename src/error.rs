//! Error types for lexilog

use crate::migration::MigrationReport;
use thiserror::Error;

/// Main error type for the lexilog library
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite store error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV output error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A single record could not be converted
    #[error("invalid {kind} record {identity}: {message}")]
    InvalidRecord {
        kind: &'static str,
        identity: String,
        message: String,
    },

    /// A located legacy blob does not have the expected shape
    #[error("legacy data under `{key}` is malformed: {message}")]
    LegacyShape { key: String, message: String },

    /// Migration aborted; the report carries everything processed up to the failure
    #[error("migration failed: {source}")]
    Migration {
        report: Box<MigrationReport>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn invalid_record(
        kind: &'static str,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::InvalidRecord {
            kind,
            identity: identity.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for lexilog
pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LiftError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("network request failed: {0}")]
    Network(String),

    #[error("remote returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("no CSV file found in archive {0}")]
    CsvNotFound(String),

    #[error("CSV parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("lifter not found: {0}")]
    LifterNotFound(String),
}

impl LiftError {
    /// True for failures caused by a deadline or an explicit cancellation.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LiftError::Timeout(_) | LiftError::Cancelled(_))
    }
}

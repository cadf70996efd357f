//! Storage error handling
//!
//! Typed errors for the local reservation store, with recovery
//! suggestions for the ones an operator can act on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to create the data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the database file
    #[error("Failed to open database at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// No reservation with this PMS id exists
    #[error("No reservation with PMS id '{pms_id}'")]
    NotFound { pms_id: String },

    /// A reservation with this PMS id already exists
    #[error("A reservation with PMS id '{pms_id}' already exists")]
    DuplicatePmsId { pms_id: String },

    /// A stored value could not be decoded
    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidData { column: &'static str, value: String },

    /// A previous writer panicked while holding the connection
    #[error("Database connection lock poisoned")]
    Poisoned,

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Map a SQLite error raised by a reservation write
    ///
    /// Unique violations on `pms_id` become `DuplicatePmsId`.
    pub(crate) fn from_write(error: rusqlite::Error, pms_id: &str) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::DuplicatePmsId {
                    pms_id: pms_id.to_string(),
                }
            }
            _ => StoreError::Database(error),
        }
    }

    /// Check if retrying later could succeed without operator action
    pub fn is_recoverable(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::Open { .. } => {
                Some("Check the data_dir setting and that no other process holds the database.")
            }
            StoreError::InvalidData { .. } => {
                Some("The database contains values this version cannot read. Run a full sync to rebuild it.")
            }
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

//! Error types for focusflow-core.
//!
//! `CoreError` is the top-level type returned across the crate boundary;
//! domain-specific failures live in the sub-enums and convert upward via
//! `#[from]`.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::Phase;

/// Top-level error type for focusflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Session state machine errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The operation is not permitted in the current phase.
    #[error("'{operation}' is not valid while the session is {phase:?}")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },

    /// An operation needed a live session and none exists.
    #[error("no active session")]
    NotFound,

    /// The session configuration is unusable.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

/// Storage errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database at {path:?}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database is locked")]
    Locked,

    #[error("Database worker is gone")]
    Closed,

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Bad row data: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(
                    e.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                DatabaseError::Locked
            }
            rusqlite::Error::FromSqlConversionFailure(column, _, source) => {
                DatabaseError::Decode(format!("column {column}: {source}"))
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Shop errors.
#[derive(Error, Debug)]
pub enum ShopError {
    #[error("asset costs {price} coins but the balance is {balance}")]
    InsufficientFunds { price: i64, balance: i64 },

    #[error("unknown asset id {0}")]
    UnknownAsset(i64),

    #[error("unknown inventory item id {0}")]
    UnknownItem(i64),

    #[error("unknown user id {0}")]
    UnknownUser(i64),
}

//! Core error types for breathwork-core.
//!
//! Configuration problems with a protocol are rejected before the engine
//! mutates anything. Collaborator failures have their own type so the
//! session runner can log them without letting them reach the tick loop.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed breathing protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A protocol that the phase engine refuses to run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol '{id}' has an empty pattern")]
    EmptyPattern { id: String },

    #[error("protocol '{id}' has {pattern} durations but {phases} phase labels")]
    LengthMismatch {
        id: String,
        pattern: usize,
        phases: usize,
    },

    /// Every phase lasts zero seconds, so a cycle could never consume a tick.
    #[error("protocol '{id}' has only zero-length phases")]
    AllZeroPattern { id: String },

    #[error("protocol '{id}' has a zero session duration")]
    ZeroSessionDuration { id: String },

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Failure reported by a session recorder or the ambient-audio collaborator.
///
/// These never propagate into the engine; the runner logs them and
/// broadcasts a notice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("session recorder failed: {0}")]
    Recorder(String),

    #[error("ambient audio failed: {0}")]
    Audio(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<DatabaseError> for CollaboratorError {
    fn from(err: DatabaseError) -> Self {
        CollaboratorError::Recorder(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

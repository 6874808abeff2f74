//! Error types for TemporaDB operations.

use std::path::PathBuf;
use thiserror::Error;

use tempora_common::KeyError;

/// Result type alias for TemporaDB operations.
pub type TemporaResult<T> = std::result::Result<T, TemporaError>;

/// The main error type for TemporaDB.
///
/// Every public operation resolves with its documented result or fails with
/// exactly one of these variants. The only partial-success shape is
/// [`TemporaError::Put`], which reports how many rows of a best-effort batch
/// were not written.
#[derive(Debug, Error)]
pub enum TemporaError {
    /// The database could not be opened.
    #[error("failed to open database {path}: {source}")]
    Open {
        /// Path of the database file.
        path: PathBuf,
        /// The underlying engine error.
        source: redb::Error,
    },

    /// Another live connection prevents opening or destroying the database.
    #[error("database {path} is blocked by another connection")]
    Blocked {
        /// Path of the database file.
        path: PathBuf,
    },

    /// The database file could not be deleted.
    #[error("failed to destroy database {path}: {source}")]
    Destroy {
        /// Path of the database file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Some rows of a put batch failed to write.
    ///
    /// The batch is best-effort: remaining rows were still attempted and the
    /// transaction committed. The operation is not retried automatically —
    /// re-issue the batch to recover.
    #[error("put failed for {failed} row(s)")]
    Put {
        /// Number of rows that were not written.
        failed: usize,
    },

    /// A read, cursor, or range operation failed.
    #[error("failed to {op}: {source}")]
    Query {
        /// The operation that failed.
        op: &'static str,
        /// The underlying engine error.
        source: redb::Error,
    },

    /// A transaction could not be opened or committed.
    #[error("transaction failed: {source}")]
    Transaction {
        /// The underlying engine error.
        source: redb::Error,
    },

    /// A value could not be used as a table key.
    #[error("invalid key: {source}")]
    Key {
        /// The key construction error.
        #[from]
        source: KeyError,
    },

    /// The connection was explicitly closed.
    #[error("connection is closed")]
    Closed,

    /// The configuration failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong.
        message: String,
    },

    /// A stored row value could not be decoded.
    #[error("corrupted row value: {message}")]
    Corrupted {
        /// Description of the decode failure.
        message: String,
    },

    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl TemporaError {
    /// Returns true if this is a partial-write failure whose batch can be
    /// re-issued.
    #[must_use]
    pub const fn is_put_failure(&self) -> bool {
        matches!(self, Self::Put { .. })
    }

    /// Returns true if another connection blocked the operation.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// The engine error underneath, if any.
    pub(crate) fn engine_source(&self) -> Option<&redb::Error> {
        match self {
            Self::Open { source, .. } | Self::Query { source, .. } | Self::Transaction { source } => {
                Some(source)
            }
            _ => None,
        }
    }
}

/// Whether an engine error invalidates the connection rather than just the
/// failing operation.
pub(crate) fn connection_lost(err: &redb::Error) -> bool {
    matches!(
        err,
        redb::Error::Io(_)
            | redb::Error::Corrupted(_)
            | redb::Error::LockPoisoned(_)
            | redb::Error::PreviousIo
    )
}

/// Short label for a connection-loss class, used in logs.
pub(crate) fn loss_reason(err: &redb::Error) -> &'static str {
    match err {
        redb::Error::Io(_) => "i/o failure",
        redb::Error::Corrupted(_) => "corruption",
        redb::Error::LockPoisoned(_) => "poisoned lock",
        redb::Error::PreviousIo => "earlier i/o failure",
        _ => "engine failure",
    }
}

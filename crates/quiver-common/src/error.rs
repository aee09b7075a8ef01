//! Error types for Quiver.
//!
//! Everything fallible returns [`Result`]. The top-level [`Error`] wraps
//! the more specific [`TransactionError`] and [`QueryError`] so callers can
//! match on broad categories without losing detail.

use std::fmt;

use thiserror::Error;

/// Convenience alias used across all Quiver crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A lookup by id returned nothing.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of entity was looked up ("node", "edge", ...).
        kind: &'static str,
        /// The id that missed.
        id: String,
    },

    /// A write would violate a uniqueness constraint.
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// What kind of entity collided.
        kind: &'static str,
        /// The offending id.
        id: String,
    },

    /// An edge references a node that does not exist.
    #[error("referential integrity: edge {edge} references missing node {node}")]
    ReferentialIntegrity {
        /// The edge id.
        edge: String,
        /// The missing endpoint id.
        node: String,
    },

    /// Transaction lifecycle violation.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Lex, parse or evaluation failure in the query pipeline.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A WAL append or fsync failed; the commit did not happen.
    #[error("durability failure: {0}")]
    Durability(String),

    /// Replay encountered a malformed complete WAL record.
    #[error("corrupt WAL record at offset {offset}: {reason}")]
    CorruptRecord {
        /// Byte offset of the record's length prefix.
        offset: u64,
        /// Why decoding failed.
        reason: String,
    },

    /// Snapshot file read or write failure.
    #[error("snapshot: {0}")]
    Snapshot(String),

    /// Underlying I/O failure outside the WAL append path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Transaction lifecycle errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// An operation required a transaction in a different state.
    #[error("invalid transaction state: expected {expected}, found {found}")]
    InvalidState {
        /// The state the operation required.
        expected: &'static str,
        /// The state the transaction was actually in.
        found: &'static str,
    },
}

/// What went wrong in the query pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Lexing or parsing failed.
    Syntax,
    /// An expression compared incomparable values.
    Type,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorKind::Syntax => write!(f, "syntax"),
            QueryErrorKind::Type => write!(f, "type"),
        }
    }
}

/// A query error with an optional byte position into the query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// Broad category.
    pub kind: QueryErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Byte offset into the query text, when known.
    pub position: Option<usize>,
}

impl QueryError {
    /// Creates a new query error.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Syntax, message)
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Type, message)
    }

    /// Attaches a byte position.
    #[must_use]
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} error at position {}: {}", self.kind, pos, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for QueryError {}

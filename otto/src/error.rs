//! Error kinds surfaced by the core.

use std::fmt;

/// Crate-wide result alias.
pub type CResult<T> = Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Get for an absent key, or with no version visible at the reader's timestamp.
    NotFound(String),

    /// A `ConcurrentEdited` check failed (snapshot-isolation write conflict).
    Conflict(String),

    /// Adding an RW-antidependency edge would complete a dangerous structure.
    Serialization(String),

    /// Unknown command or wrong arity.
    BadRequest(String),

    /// WAL append or read failed.
    Io(String),

    /// An invariant was violated.
    Internal(String),

    /// A WAL frame failed to decode.
    Parse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "not found: {msg}"),
            Error::Conflict(msg) => write!(f, "Txn Aborted: {msg}"),
            Error::Serialization(msg) => write!(f, "Txn Aborted: {msg}"),
            Error::BadRequest(msg) => write!(f, "ERR {msg}"),
            Error::Io(msg) => write!(f, "WAL I/O error: {msg}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// True for the two conflict kinds that the dispatcher must answer by
    /// aborting the transaction that triggered them.
    pub fn aborts_transaction(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_serialization_abort_the_transaction() {
        assert!(Error::Conflict("x".into()).aborts_transaction());
        assert!(Error::Serialization("x".into()).aborts_transaction());
        assert!(!Error::NotFound("x".into()).aborts_transaction());
        assert!(!Error::BadRequest("x".into()).aborts_transaction());
    }
}

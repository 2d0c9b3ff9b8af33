use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures reported by a [`Store`](crate::store::Store) implementation.
///
/// The tree never inspects these, it only hands them back to the caller inside
/// [`Error::Store`].
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("key is already present: {0}")]
    DuplicateKey(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("broken linkage: {0}")]
    Linkage(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to deserialize: {0}")]
    FailedDeserialization(String),
}

impl From<hex::FromHexError> for Error {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn from(error: hex::FromHexError) -> Self {
        Error::FailedDeserialization(format!("{}", error))
    }
}

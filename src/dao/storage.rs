use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium could not be read or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the store was doing when the failure happened.
        message: String,
        /// Underlying backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// An artifact exists but could not be decoded.
    #[error("malformed artifact `{artifact}`: {message}")]
    Malformed {
        /// Path or name of the offending artifact.
        artifact: String,
        /// What made it undecodable.
        message: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an error describing an artifact that could not be decoded.
    pub fn malformed(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Malformed {
            artifact: artifact.into(),
            message: message.into(),
        }
    }
}

//! Error types for tabdeck.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No storage backend exists in this execution context.
    #[error("storage is not available in this execution context")]
    StorageUnavailable,

    /// A read returned data that could not be decoded, or the backend failed
    /// while reading. Read paths recover from this locally.
    #[error("failed to read {key} from storage: {reason}")]
    StorageRead { key: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A background, widget, or settings constructor failed.
    #[error("failed to construct {what}: {reason}")]
    Construction { what: String, reason: String },

    /// The caller-supplied persist handler of a commit failed.
    #[error("failed to persist workspace: {0}")]
    Persist(#[source] Box<Error>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn construction(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

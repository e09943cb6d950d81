//! Error types for the listgraph engine.

use crate::{EventId, Kind, PublicKey};
use thiserror::Error;

/// Failures raised by a [`StorageBackend`](crate::backend::StorageBackend).
///
/// Carries rendered messages rather than the source errors so that
/// [`Error`] stays `Clone + Eq`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage i/o failure: {0}")]
    Io(String),

    #[error("storage serialization failure: {0}")]
    Serialization(String),

    #[error("corrupt storage entry: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// All possible errors from the listgraph engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("list name must not be empty")]
    EmptyName,

    #[error("ownership mismatch: actor {actor} cannot modify data owned by {owner}")]
    OwnershipMismatch { actor: PublicKey, owner: PublicKey },

    #[error("no active account")]
    MissingActor,

    #[error("kind {0} is not a list kind")]
    NotAList(Kind),

    #[error("event {id} has replaceable kind {kind}; reference it by coordinate instead")]
    ReplaceableTarget { id: EventId, kind: Kind },

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    // Lookup errors
    #[error("not found: {0}")]
    NotFound(String),

    // Collaborator errors
    #[error("signing failed: {0}")]
    Signing(String),

    /// For hosts that publish outside [`SyncEngine`](crate::SyncEngine) and
    /// report through the same error type.
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    // State errors
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse taxonomy used when reporting failures to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Signing,
    Publish,
    Fetch,
    Storage,
}

impl Error {
    /// Which bucket of the taxonomy this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidCoordinate(_)
            | Error::InvalidInput(_)
            | Error::EmptyName
            | Error::OwnershipMismatch { .. }
            | Error::MissingActor
            | Error::NotAList(_)
            | Error::ReplaceableTarget { .. }
            | Error::InvalidEvent(_) => ErrorCategory::Validation,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::Signing(_) => ErrorCategory::Signing,
            Error::Publish(_) => ErrorCategory::Publish,
            Error::Fetch(_) => ErrorCategory::Fetch,
            Error::Storage(_) => ErrorCategory::Storage,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Event signing.

use crate::{event::UnsignedEvent, Event};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("signer unavailable")]
    Unavailable,

    #[error("signing request declined")]
    Declined,

    #[error("signing failed: {0}")]
    Failed(String),
}

/// Turns unsigned events into signed ones.
///
/// Implementations may wait on user approval; callers that need a bound
/// wrap the call in a timeout.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event, SignerError>;
}

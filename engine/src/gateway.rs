//! Relay gateway abstraction.
//!
//! The engine never talks to the network itself; the host application
//! provides a [`RelayGateway`] that fans requests out to its relays.

use crate::{Event, EventId, Kind, PublicKey, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// A NIP-01 subscription filter.
///
/// Unset fields match everything and are left out of the JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<EventId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<PublicKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<Kind>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = EventId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = PublicKey>) -> Self {
        self.authors = Some(authors.into_iter().collect());
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` satisfies every set field (`limit` aside).
    pub fn matches(&self, event: &Event) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&event.id))
            && self
                .authors
                .as_ref()
                .map_or(true, |a| a.contains(&event.author))
            && self.kinds.as_ref().map_or(true, |k| k.contains(&event.kind))
            && self.since.map_or(true, |since| event.created_at >= since)
    }
}

/// Failures reported by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no relay reachable: {0}")]
    Unavailable(String),

    #[error("relay request timed out")]
    Timeout,

    #[error("relay rejected request: {0}")]
    Rejected(String),
}

/// Access to the remote event log.
#[async_trait]
pub trait RelayGateway: Send + Sync {
    /// Events matching `filter` from the configured relays.
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>, GatewayError>;

    /// Send a signed event. Returns the endpoints that accepted it; an empty
    /// set means nobody did.
    async fn publish(&self, event: &Event) -> Result<HashSet<String>, GatewayError>;
}

//! Stored records and the profile projection.

use crate::{coordinate::Coordinate, kind, Event, EventId, PublicKey, Timestamp};
use serde::{Deserialize, Serialize};

/// Local bookkeeping of whether a record has reached any relay.
///
/// Never part of an event on the wire; network-sourced events arrive
/// without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    /// No local knowledge either way
    #[default]
    Unset,
    /// Produced locally, not yet accepted by a relay
    Unpublished,
    /// Accepted by at least one relay (terminal)
    Published,
}

impl PublicationState {
    /// Whether the outgoing sync phase should still try to publish this.
    pub fn is_pending(self) -> bool {
        !matches!(self, PublicationState::Published)
    }

    /// State of a record replacing one that was in `previous`.
    ///
    /// An explicit state wins; otherwise the previous state carries over so
    /// a network copy cannot erase a pending local edit.
    pub fn merge(previous: Option<Self>, explicit: Option<Self>) -> Self {
        explicit.or(previous).unwrap_or_default()
    }
}

/// An event together with its local publication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub event: Event,
    #[serde(default)]
    pub publication_state: PublicationState,
}

impl StorageRecord {
    /// Create a new record.
    pub fn new(event: Event, publication_state: PublicationState) -> Self {
        Self {
            event,
            publication_state,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.event.id
    }

    pub fn author(&self) -> &PublicKey {
        &self.event.author
    }

    pub fn coordinate(&self) -> Coordinate {
        self.event.coordinate()
    }

    pub fn is_published(&self) -> bool {
        self.publication_state == PublicationState::Published
    }

    /// Mark the record as accepted by a relay.
    pub fn mark_published(&mut self) {
        self.publication_state = PublicationState::Published;
    }
}

/// Latest known profile metadata of an author.
///
/// Maintained as a side effect of storing `kind:0` events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub author: PublicKey,
    pub event_id: EventId,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
}

/// The JSON body of a profile event.
#[derive(Debug, Default, Deserialize)]
struct ProfileContent {
    name: Option<String>,
    display_name: Option<String>,
    #[serde(rename = "displayName")]
    display_name_camel: Option<String>,
    picture: Option<String>,
    about: Option<String>,
    nip05: Option<String>,
}

impl Profile {
    /// Project a profile event. Unparsable content gives an empty profile.
    pub fn from_event(event: &Event) -> Option<Self> {
        if event.kind != kind::PROFILE {
            return None;
        }
        let content: ProfileContent = serde_json::from_str(&event.content).unwrap_or_default();
        Some(Self {
            author: event.author.clone(),
            event_id: event.id.clone(),
            created_at: event.created_at,
            name: non_empty(content.name),
            display_name: non_empty(content.display_name.or(content.display_name_camel)),
            picture: non_empty(content.picture),
            about: non_empty(content.about),
            nip05: non_empty(content.nip05),
        })
    }

    /// Best name to show for this author.
    pub fn best_name(&self) -> Option<&str> {
        self.display_name.as_deref().or(self.name.as_deref())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

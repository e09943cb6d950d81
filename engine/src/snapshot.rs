//! Snapshot types for persisting and restoring store state.
//!
//! Snapshots are the bridge between the in-memory [`EventStore`] and
//! persistent storage. They are designed for deterministic serialization.
//!
//! [`EventStore`]: crate::store::EventStore

use crate::{
    error::{Result, StorageError},
    record::{Profile, StorageRecord},
    EventId, PublicKey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of the store.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// The `events` collection, keyed by event id
    pub events: BTreeMap<EventId, StorageRecord>,
    /// The `profiles` projection, keyed by author
    pub profiles: BTreeMap<PublicKey, Profile>,
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            events: BTreeMap::new(),
            profiles: BTreeMap::new(),
        }
    }

    /// Add a record to the snapshot.
    pub fn add_record(&mut self, record: StorageRecord) {
        self.events.insert(record.event.id.clone(), record);
    }

    /// Add a profile to the snapshot.
    pub fn add_profile(&mut self, profile: Profile) {
        self.profiles.insert(profile.author.clone(), profile);
    }

    /// Count records.
    pub fn record_count(&self) -> usize {
        self.events.len()
    }

    /// Check every record is stored under its own id.
    pub fn validate(&self) -> Result<()> {
        for (key, record) in &self.events {
            if key != &record.event.id {
                return Err(StorageError::Corrupt(format!(
                    "record {} stored under key {key}",
                    record.event.id
                ))
                .into());
            }
        }
        for (key, profile) in &self.profiles {
            if key != &profile.author {
                return Err(StorageError::Corrupt(format!(
                    "profile of {} stored under key {key}",
                    profile.author
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self).map_err(StorageError::from)?)
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(StorageError::from)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json).map_err(StorageError::from)?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(StorageError::Corrupt(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            ))
            .into());
        }

        snapshot.validate()?;
        Ok(snapshot)
    }
}

//! EventStore - the keyed, last-write-wins event container.
//!
//! The store holds at most one record per [`Coordinate`], tracks the local
//! publication state of each record and keeps a profile projection of the
//! newest `kind:0` event per author. Every change is written through the
//! [`StorageBackend`] before it becomes visible in memory.

use crate::{
    backend::{MemoryBackend, StorageBackend},
    coordinate::Coordinate,
    error::Result,
    kind,
    record::{Profile, PublicationState, StorageRecord},
    snapshot::StoreSnapshot,
    Event, EventId, Kind, PublicKey, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// What a [`EventStore::put`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PutOutcome {
    /// Nothing was stored at this coordinate before
    Inserted,
    /// An older version was superseded
    Replaced,
    /// The event lost to the stored version, or was already stored
    Stale,
}

impl PutOutcome {
    /// Whether the visible contents of the store changed.
    pub fn changed(self) -> bool {
        !matches!(self, PutOutcome::Stale)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<Coordinate, StorageRecord>,
    by_id: HashMap<EventId, Coordinate>,
    profiles: HashMap<PublicKey, Profile>,
}

impl StoreState {
    /// Merge a record in memory only. Returns the id of the record it
    /// displaced, if any, and the outcome.
    fn merge(&mut self, incoming: StorageRecord) -> (PutOutcome, Option<EventId>) {
        let coordinate = incoming.coordinate();
        match self.records.get_mut(&coordinate) {
            Some(current) if current.event.id == incoming.event.id => {
                if incoming.is_published() {
                    current.mark_published();
                }
                (PutOutcome::Stale, None)
            }
            Some(current) if !incoming.event.supersedes(&current.event) => {
                (PutOutcome::Stale, None)
            }
            Some(current) => {
                let displaced = std::mem::replace(current, incoming);
                self.by_id.remove(&displaced.event.id);
                self.by_id.insert(current.event.id.clone(), coordinate);
                refresh_profile(&mut self.profiles, &current.event);
                (PutOutcome::Replaced, Some(displaced.event.id))
            }
            None => {
                self.by_id.insert(incoming.event.id.clone(), coordinate.clone());
                refresh_profile(&mut self.profiles, &incoming.event);
                self.records.insert(coordinate, incoming);
                (PutOutcome::Inserted, None)
            }
        }
    }
}

fn refresh_profile(profiles: &mut HashMap<PublicKey, Profile>, event: &Event) {
    let Some(profile) = Profile::from_event(event) else {
        return;
    };
    let newer = profiles
        .get(&profile.author)
        .map_or(true, |p| p.created_at <= profile.created_at);
    if newer {
        profiles.insert(profile.author.clone(), profile);
    }
}

/// The event store.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self` and each
/// write is atomic under the internal lock.
pub struct EventStore {
    state: RwLock<StoreState>,
    backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore").finish_non_exhaustive()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl EventStore {
    /// Create an empty store without durability.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            backend: Arc::new(MemoryBackend),
        }
    }

    /// Open a store over `backend`, replaying everything it holds through
    /// the last-write-wins merge.
    ///
    /// Records that lose the replay (left behind by an interrupted write)
    /// are deleted from the backend.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let snapshot = backend.load()?;
        let mut state = StoreState {
            profiles: snapshot.profiles.into_iter().collect(),
            ..StoreState::default()
        };

        let mut leftovers = Vec::new();
        for record in snapshot.events.into_values() {
            let id = record.event.id.clone();
            match state.merge(record) {
                (PutOutcome::Stale, _) => leftovers.push(id),
                (_, Some(displaced)) => leftovers.push(displaced),
                _ => {}
            }
        }
        for id in leftovers {
            debug!(event_id = %id, "dropping superseded record left in storage");
            backend.remove_record(&id)?;
        }

        debug!(records = state.records.len(), "event store opened");
        Ok(Self {
            state: RwLock::new(state),
            backend,
        })
    }

    /// Store an event, applying the replaceable-set rules.
    ///
    /// `explicit_state` overrides the publication state; when absent the new
    /// record inherits the state of the record it replaces.
    pub async fn put(
        &self,
        event: Event,
        explicit_state: Option<PublicationState>,
    ) -> Result<PutOutcome> {
        let mut state = self.state.write().await;
        let coordinate = event.coordinate();
        let current = state.records.get(&coordinate);

        let record = match current {
            Some(current) if current.event.id == event.id => {
                // Same event again: only an upgrade to published is recorded.
                if explicit_state == Some(PublicationState::Published) && !current.is_published()
                {
                    let mut upgraded = current.clone();
                    upgraded.mark_published();
                    self.backend.save_record(&upgraded)?;
                    state.merge(upgraded);
                }
                return Ok(PutOutcome::Stale);
            }
            Some(current) if !event.supersedes(&current.event) => {
                debug!(
                    coordinate = %coordinate,
                    incoming = %event.id,
                    stored = %current.event.id,
                    "ignoring stale version"
                );
                return Ok(PutOutcome::Stale);
            }
            Some(current) => StorageRecord::new(
                event,
                PublicationState::merge(Some(current.publication_state), explicit_state),
            ),
            None => StorageRecord::new(event, PublicationState::merge(None, explicit_state)),
        };

        self.backend.save_record(&record)?;
        if let Some(profile) = Profile::from_event(&record.event) {
            if let Err(e) = self.backend.save_profile(&profile) {
                if let Err(undo) = self.backend.remove_record(&record.event.id) {
                    warn!(event_id = %record.event.id, error = %undo, "failed to undo record write");
                }
                return Err(e.into());
            }
        }

        let (outcome, displaced) = state.merge(record);
        if let Some(old) = displaced {
            // A leftover file loses the replay on the next open.
            if let Err(e) = self.backend.remove_record(&old) {
                warn!(event_id = %old, error = %e, "failed to delete superseded record");
            }
        }
        Ok(outcome)
    }

    /// Look up an event by id.
    pub async fn get_by_id(&self, id: &str) -> Option<Event> {
        let state = self.state.read().await;
        let coordinate = state.by_id.get(id)?;
        state.records.get(coordinate).map(|r| r.event.clone())
    }

    /// Look up the current record at a coordinate.
    pub async fn get_by_coordinate(&self, coordinate: &Coordinate) -> Option<StorageRecord> {
        self.state.read().await.records.get(coordinate).cloned()
    }

    /// Records by `author` that have not reached a relay yet, oldest first.
    pub async fn get_unpublished(&self, author: &str) -> Result<Vec<StorageRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| r.event.author == author && r.publication_state.is_pending())
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.event
                .created_at
                .cmp(&b.event.created_at)
                .then_with(|| a.event.id.cmp(&b.event.id))
        });
        Ok(records)
    }

    /// Record that a relay accepted the event. Idempotent.
    pub async fn mark_published(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let Some(coordinate) = state.by_id.get(id).cloned() else {
            warn!(event_id = %id, "mark_published for unknown event");
            return Ok(());
        };
        let Some(record) = state.records.get_mut(&coordinate) else {
            return Ok(());
        };
        if record.is_published() {
            return Ok(());
        }
        let mut updated = record.clone();
        updated.mark_published();
        self.backend.save_record(&updated)?;
        *record = updated;
        Ok(())
    }

    /// Newest `created_at` among the author's records.
    pub async fn latest_timestamp_for(&self, author: &str) -> Option<Timestamp> {
        self.state
            .read()
            .await
            .records
            .values()
            .filter(|r| r.event.author == author)
            .map(|r| r.event.created_at)
            .max()
    }

    /// Remove whatever is stored at a coordinate. Returns whether anything
    /// was removed.
    pub async fn remove(&self, coordinate: &Coordinate) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(record) = state.records.get(coordinate) else {
            return Ok(false);
        };
        let id = record.event.id.clone();
        let author = record.event.author.clone();
        let was_profile = record.event.kind == kind::PROFILE;

        self.backend.remove_record(&id)?;
        if was_profile {
            self.backend.remove_profile(&author)?;
            state.profiles.remove(&author);
        }
        state.records.remove(coordinate);
        state.by_id.remove(&id);
        Ok(true)
    }

    /// Records matching every given constraint, newest first.
    ///
    /// `None` means "any".
    pub async fn query(
        &self,
        authors: Option<&[PublicKey]>,
        kinds: Option<&[Kind]>,
    ) -> Vec<StorageRecord> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| authors.map_or(true, |a| a.contains(&r.event.author)))
            .filter(|r| kinds.map_or(true, |k| k.contains(&r.event.kind)))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.event.version().cmp(&a.event.version()));
        records
    }

    /// Latest known profile of an author.
    pub async fn get_profile(&self, author: &str) -> Option<Profile> {
        self.state.read().await.profiles.get(author).cloned()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copy the full state into a snapshot.
    pub async fn export_snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        let mut snapshot = StoreSnapshot::new();
        for record in state.records.values() {
            snapshot.add_record(record.clone());
        }
        for profile in state.profiles.values() {
            snapshot.add_profile(profile.clone());
        }
        snapshot
    }

    /// Merge every record of a snapshot into the store.
    ///
    /// Returns how many records changed the store.
    pub async fn import_snapshot(&self, snapshot: StoreSnapshot) -> Result<usize> {
        snapshot.validate()?;
        let mut changed = 0;
        for record in snapshot.events.into_values() {
            let state = record.publication_state;
            if self.put(record.event, Some(state)).await?.changed() {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

//! Copy-on-write editing of lists.
//!
//! Events are immutable, so every edit produces a complete new version of
//! the list: the current tags are read from the [`EventStore`], changed,
//! signed with a fresh timestamp and stored as unpublished. The next sync
//! pushes the new version out.
//!
//! Every operation checks ownership twice: once against the author encoded
//! in the coordinate and once against the author of the stored record.

use crate::{
    clock::{next_timestamp, Clock, SystemClock},
    coordinate::Coordinate,
    error::Result,
    event::{Tag, UnsignedEvent},
    gateway::{Filter, RelayGateway},
    item::{Item, TypedReference, DISPLAY_NAME_TAGS},
    kind::{self, KindClass},
    record::{PublicationState, StorageRecord},
    resolver::IdentifierResolver,
    signer::Signer,
    store::EventStore,
    Error, Event, EventId, Kind, PublicKey,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of a mutation. Failures are reported here rather than as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub success: bool,
    /// Id of the current version after the operation (for deletions, of
    /// the version that was removed)
    pub event_id: Option<EventId>,
    /// Whether a new version was written
    pub changed: bool,
    pub error: Option<Error>,
}

impl MutationResult {
    fn changed(event_id: EventId) -> Self {
        Self {
            success: true,
            event_id: Some(event_id),
            changed: true,
            error: None,
        }
    }

    fn unchanged(event_id: EventId) -> Self {
        Self {
            success: true,
            event_id: Some(event_id),
            changed: false,
            error: None,
        }
    }

    fn failed(error: Error) -> Self {
        Self {
            success: false,
            event_id: None,
            changed: false,
            error: Some(error),
        }
    }

    /// Human-readable failure reason.
    pub fn reason(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Editing operations on the lists of the active account.
pub struct ListMutationService {
    store: Arc<EventStore>,
    signer: Arc<dyn Signer>,
    gateway: Arc<dyn RelayGateway>,
    resolver: Arc<dyn IdentifierResolver>,
    actor: Option<PublicKey>,
    clock: Arc<dyn Clock>,
}

impl ListMutationService {
    pub fn new(
        store: Arc<EventStore>,
        signer: Arc<dyn Signer>,
        gateway: Arc<dyn RelayGateway>,
        resolver: Arc<dyn IdentifierResolver>,
        actor: Option<PublicKey>,
    ) -> Self {
        Self {
            store,
            signer,
            gateway,
            resolver,
            actor,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// Create an empty list titled `title`.
    ///
    /// Parameterized kinds get a fresh random `d` identifier. A standard
    /// replaceable kind holds one list per author, so creating it again is
    /// refused.
    pub async fn create_list(&self, kind: Kind, title: &str) -> MutationResult {
        Self::finish("create_list", self.try_create_list(kind, title).await)
    }

    /// Add the item described by `raw_input` to a list.
    ///
    /// Adding an item that is already present returns the current version
    /// without writing a new one.
    pub async fn add_item(&self, coordinate: &str, raw_input: &str) -> MutationResult {
        Self::finish("add_item", self.try_add_item(coordinate, raw_input).await)
    }

    /// Remove every tag storing `item`. Always writes a new version, even
    /// when the item is absent.
    pub async fn remove_item(&self, coordinate: &str, item: &Item) -> MutationResult {
        Self::finish("remove_item", self.try_remove_item(coordinate, item).await)
    }

    /// Change the display name of a list. The `d` identifier never changes,
    /// so references to the list keep resolving.
    pub async fn rename_list(&self, coordinate: &str, new_name: &str) -> MutationResult {
        Self::finish("rename_list", self.try_rename_list(coordinate, new_name).await)
    }

    /// Ask relays to delete a list and remove it locally.
    ///
    /// The deletion request is best effort; only the local removal can fail
    /// the operation.
    pub async fn delete_list(&self, coordinate: &str) -> MutationResult {
        Self::finish("delete_list", self.try_delete_list(coordinate).await)
    }

    fn finish(operation: &'static str, result: Result<MutationResult>) -> MutationResult {
        match result {
            Ok(result) => {
                debug!(operation, event_id = ?result.event_id, changed = result.changed, "mutation done");
                result
            }
            Err(e) => {
                warn!(operation, error = %e, category = ?e.category(), "mutation failed");
                MutationResult::failed(e)
            }
        }
    }

    async fn try_create_list(&self, kind: Kind, title: &str) -> Result<MutationResult> {
        let actor = self.require_actor()?;
        if !kind::is_list(kind) {
            return Err(Error::NotAList(kind));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::EmptyName);
        }

        let mut tags = Vec::new();
        if KindClass::of(kind) == KindClass::ParameterizedReplaceable {
            tags.push(Tag::new(["d".to_string(), Uuid::new_v4().to_string()]));
        } else {
            let existing = Coordinate::Replaceable {
                kind,
                author: actor.clone(),
            };
            if self.store.get_by_coordinate(&existing).await.is_some() {
                return Err(Error::InvalidInput(format!("{existing} already exists")));
            }
        }
        tags.push(Tag::new(["title", title]));

        let unsigned = UnsignedEvent::new(actor, kind, self.clock.now(), tags, "");
        let signed = self.sign(unsigned).await?;
        let id = signed.id.clone();
        self.store.put(signed, Some(PublicationState::Unpublished)).await?;
        Ok(MutationResult::changed(id))
    }

    async fn try_add_item(&self, coordinate: &str, raw_input: &str) -> Result<MutationResult> {
        let input = raw_input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("nothing to add".into()));
        }
        let current = self.load_owned(coordinate).await?;

        let reference = self
            .resolver
            .resolve(input)
            .await
            .ok_or_else(|| Error::InvalidInput(format!("unrecognized reference {input:?}")))?;
        let item = self.item_for(reference).await?;

        if current.event.tags.iter().any(|t| item.matches_tag(t)) {
            return Ok(MutationResult::unchanged(current.event.id));
        }

        let mut tags = current.event.tags.clone();
        tags.push(item.to_tag());
        self.write_version(&current.event, tags).await
    }

    async fn try_remove_item(&self, coordinate: &str, item: &Item) -> Result<MutationResult> {
        let current = self.load_owned(coordinate).await?;
        let tags = current
            .event
            .tags
            .iter()
            .filter(|t| !item.matches_tag(t))
            .cloned()
            .collect();
        self.write_version(&current.event, tags).await
    }

    async fn try_rename_list(&self, coordinate: &str, new_name: &str) -> Result<MutationResult> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        let current = self.load_owned(coordinate).await?;

        let title = Tag::new(["title", name]);
        let mut tags = Vec::with_capacity(current.event.tags.len() + 1);
        let mut placed = false;
        for tag in &current.event.tags {
            let is_name = tag.name().is_some_and(|n| DISPLAY_NAME_TAGS.contains(&n));
            if !is_name {
                tags.push(tag.clone());
            } else if !placed {
                tags.push(title.clone());
                placed = true;
            }
        }
        if !placed {
            let at = tags
                .iter()
                .position(|t| t.name() == Some("d"))
                .map_or(0, |i| i + 1);
            tags.insert(at, title);
        }

        if tags == current.event.tags {
            return Ok(MutationResult::unchanged(current.event.id));
        }
        self.write_version(&current.event, tags).await
    }

    async fn try_delete_list(&self, coordinate: &str) -> Result<MutationResult> {
        let current = self.load_owned(coordinate).await?;
        let address = current.coordinate();

        self.request_deletion(&current.event, &address).await;

        self.store.remove(&address).await?;
        Ok(MutationResult::changed(current.event.id))
    }

    /// Sign and publish a deletion request. Failures are only logged.
    async fn request_deletion(&self, event: &Event, address: &Coordinate) {
        let marker = UnsignedEvent::new(
            event.author.clone(),
            kind::DELETION,
            self.clock.now(),
            vec![
                Tag::new(["e", event.id.as_str()]),
                Tag::new(["a".to_string(), address.to_string()]),
            ],
            "",
        );
        let signed = match self.sign(marker).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!(%address, error = %e, "could not sign deletion request");
                return;
            }
        };
        match self.gateway.publish(&signed).await {
            Ok(accepted) if accepted.is_empty() => {
                warn!(%address, "no relay accepted deletion request");
            }
            Ok(accepted) => {
                debug!(%address, relays = accepted.len(), "deletion request published");
            }
            Err(e) => warn!(%address, error = %e, "could not publish deletion request"),
        }
    }

    fn require_actor(&self) -> Result<PublicKey> {
        self.actor.clone().ok_or(Error::MissingActor)
    }

    /// Parse `coordinate` and load the list it names, checking that the
    /// active account owns it.
    async fn load_owned(&self, coordinate: &str) -> Result<StorageRecord> {
        let actor = self.require_actor()?;
        let coordinate = Coordinate::parse(coordinate)?;

        let owner = coordinate.author().unwrap_or_default();
        if owner != actor {
            return Err(Error::OwnershipMismatch {
                actor,
                owner: owner.to_string(),
            });
        }
        if let Some(k) = coordinate.kind().filter(|k| !kind::is_list(*k)) {
            return Err(Error::NotAList(k));
        }

        let record = self
            .store
            .get_by_coordinate(&coordinate)
            .await
            .ok_or_else(|| Error::NotFound(coordinate.to_string()))?;
        if record.event.author != actor {
            return Err(Error::OwnershipMismatch {
                actor,
                owner: record.event.author,
            });
        }
        Ok(record)
    }

    /// Turn a resolved reference into an item ready for storage.
    async fn item_for(&self, reference: TypedReference) -> Result<Item> {
        match reference {
            TypedReference::Profile { pubkey, relay_hint } => Ok(Item::ProfileRef {
                pubkey,
                relay_hint,
                petname: None,
            }),
            TypedReference::Address {
                coordinate,
                relay_hint,
            } => Ok(Item::AddressRef {
                coordinate,
                relay_hint,
            }),
            TypedReference::IdentityClaim { identifier } => {
                let pubkey_hint = self
                    .resolver
                    .resolve_identity_claim(&identifier)
                    .await
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("identity claim {identifier} not found"))
                    })?;
                Ok(Item::IdentityClaim {
                    identifier,
                    pubkey_hint,
                })
            }
            TypedReference::Event {
                id,
                relay_hint,
                kind,
            } => {
                let kind = match kind {
                    Some(kind) => Some(kind),
                    None => self.event_kind(&id).await?,
                };
                if let Some(kind) = kind.filter(|k| kind::is_replaceable(*k)) {
                    return Err(Error::ReplaceableTarget { id, kind });
                }
                Ok(Item::EventRef { id, relay_hint })
            }
        }
    }

    /// Kind of the event `id`, from the store or else the relays.
    ///
    /// `Ok(None)` means nobody knows the event; it is still accepted.
    async fn event_kind(&self, id: &str) -> Result<Option<Kind>> {
        if let Some(event) = self.store.get_by_id(id).await {
            return Ok(Some(event.kind));
        }
        let filter = Filter::new().ids([id.to_string()]).limit(1);
        let events = self
            .gateway
            .fetch(&filter)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(events.iter().find(|e| e.id == id).map(|e| e.kind))
    }

    /// Sign and store a new version of `previous` with `tags`.
    ///
    /// When a concurrent edit of the same list lands first and wins, this
    /// version is dropped and the result points at the winner.
    async fn write_version(&self, previous: &Event, tags: Vec<Tag>) -> Result<MutationResult> {
        let unsigned = UnsignedEvent::new(
            previous.author.clone(),
            previous.kind,
            next_timestamp(self.clock.as_ref(), Some(previous.created_at)),
            tags,
            previous.content.clone(),
        );
        let signed = self.sign(unsigned).await?;
        if signed.coordinate() != previous.coordinate() {
            return Err(Error::Signing(format!(
                "signed event {} no longer belongs to {}",
                signed.id,
                previous.coordinate()
            )));
        }

        let id = signed.id.clone();
        let coordinate = signed.coordinate();
        let outcome = self
            .store
            .put(signed, Some(PublicationState::Unpublished))
            .await?;
        if outcome.changed() {
            return Ok(MutationResult::changed(id));
        }

        let winner = self
            .store
            .get_by_coordinate(&coordinate)
            .await
            .map(|record| record.event.id)
            .ok_or_else(|| Error::NotFound(coordinate.to_string()))?;
        debug!(%coordinate, dropped = %id, %winner, "edit superseded by a concurrent version");
        Ok(MutationResult::unchanged(winner))
    }

    async fn sign(&self, unsigned: UnsignedEvent) -> Result<Event> {
        self.signer
            .sign(unsigned)
            .await
            .map_err(|e| Error::Signing(e.to_string()))
    }
}

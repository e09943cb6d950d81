//! # Listgraph Engine
//!
//! A local-first data layer for nested Nostr lists.
//!
//! This crate stores signed, content-addressed events, rebuilds the tree of
//! lists they describe, collects the content reachable through that tree and
//! keeps the local copy in step with the relays. Every replica converges on
//! the same state no matter in which order events arrive.
//!
//! ## Design Principles
//!
//! - **Deterministic merge**: last-write-wins with a total order, so replicas
//!   agree without a coordinator
//! - **Copy-on-write edits**: events are never mutated; edits produce new
//!   signed versions
//! - **Pluggable edges**: relays, signing and identifier lookups are traits
//!   the host application implements
//! - **Partial-failure tolerant**: one bad event never sinks a batch
//!
//! ## Core Concepts
//!
//! ### Events and coordinates
//!
//! An [`Event`] is identified by the SHA-256 of its canonical form. Events of
//! replaceable kinds also live at a [`Coordinate`] (`kind:author:d`), and the
//! [`EventStore`] keeps only the newest version per coordinate. Ties on
//! `created_at` go to the smaller id.
//!
//! ### Lists and items
//!
//! Lists carry their members as tags. [`Item`] is the typed view of those
//! tags; `a` tags pointing at other lists make lists nest. The
//! [`HierarchyBuilder`] resolves that nesting into [`ListNode`] trees and the
//! [`ContentAggregator`] walks them to collect [`ContentId`]s.
//!
//! ### Sync
//!
//! The [`SyncEngine`] pulls the author's newer events from a
//! [`RelayGateway`] and pushes records no relay has acknowledged yet,
//! tracked through each record's [`PublicationState`].
//!
//! ### Mutations
//!
//! The [`ListMutationService`] creates, edits, renames and deletes lists of
//! the active account, signing each new version through a [`Signer`].
//!
//! ## Quick Start
//!
//! ```rust
//! use listgraph_engine::{Event, EventStore, HierarchyBuilder, Tag, UnsignedEvent};
//! use std::sync::Arc;
//!
//! # async fn demo() -> listgraph_engine::Result<()> {
//! let author = "a".repeat(64);
//! let store = Arc::new(EventStore::in_memory());
//!
//! let friends = UnsignedEvent::new(
//!     author.clone(),
//!     30000,
//!     1_700_000_000,
//!     vec![Tag::new(["d", "friends"]), Tag::new(["title", "Friends"])],
//!     "",
//! );
//! store.put(Event::from_unsigned(friends, "sig"), None).await?;
//!
//! let trees = HierarchyBuilder::new(store.clone())
//!     .build_for_author(&author)
//!     .await;
//! assert_eq!(trees[0].display_name, "Friends");
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistence
//!
//! Open the store over a [`FileBackend`] to keep records across restarts,
//! or move state around with [`EventStore::export_snapshot`] and
//! [`StoreSnapshot`].

pub mod aggregate;
pub mod backend;
pub mod clock;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod event;
pub mod gateway;
pub mod hierarchy;
pub mod item;
pub mod kind;
pub mod mutation;
pub mod record;
pub mod resolver;
pub mod signer;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod version;

// Re-export main types at crate root
pub use aggregate::{ContentAggregator, ContentId};
pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use coordinate::Coordinate;
pub use error::{Error, ErrorCategory, Result, StorageError};
pub use event::{Event, Tag, UnsignedEvent};
pub use gateway::{Filter, GatewayError, RelayGateway};
pub use hierarchy::{HierarchyBuilder, ListNode};
pub use item::{Item, TypedReference};
pub use kind::KindClass;
pub use mutation::{ListMutationService, MutationResult};
pub use record::{Profile, PublicationState, StorageRecord};
pub use resolver::{DirectResolver, IdentifierResolver};
pub use signer::{Signer, SignerError};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{EventStore, PutOutcome};
pub use sync::{IncomingReport, OutgoingReport, SyncEngine, SyncReport};
pub use version::EventVersion;

/// Type aliases for clarity
pub type EventId = String;
pub type PublicKey = String;
pub type Timestamp = u64;
pub type Kind = u16;

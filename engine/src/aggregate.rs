//! Collection of the content reachable through lists.
//!
//! A list may hold content directly (`e` tags, `a` tags of content kinds) or
//! through other lists. [`ContentAggregator`] walks built hierarchies and
//! follows list references that the hierarchy did not materialize, so the
//! result covers everything reachable within the depth bound.

use crate::{
    config::EngineConfig,
    coordinate::Coordinate,
    error::Result,
    hierarchy::ListNode,
    item::Item,
    kind,
    store::EventStore,
    Error, EventId,
};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A terminal piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ContentId {
    /// A fixed event
    Event(EventId),
    /// The current version at an address
    Address(Coordinate),
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentId::Event(id) => write!(f, "{id}"),
            ContentId::Address(coordinate) => write!(f, "{coordinate}"),
        }
    }
}

/// Accumulated state of one aggregation run.
#[derive(Default)]
struct Walk {
    found: Vec<ContentId>,
    seen: HashSet<ContentId>,
    active: HashSet<Coordinate>,
}

impl Walk {
    fn collect(&mut self, id: ContentId) {
        if self.seen.insert(id.clone()) {
            self.found.push(id);
        }
    }
}

/// Collects content identifiers from list trees.
#[derive(Debug, Clone)]
pub struct ContentAggregator {
    store: Arc<EventStore>,
    max_depth: usize,
}

impl ContentAggregator {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    pub fn with_config(store: Arc<EventStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            max_depth: config.max_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Deduplicated content reachable from `nodes`, in discovery order.
    pub async fn collect(&self, nodes: &[Arc<ListNode>]) -> Vec<ContentId> {
        let mut walk = Walk::default();
        for node in nodes {
            self.visit(node.clone(), 0, &mut walk).await;
        }
        debug!(items = walk.found.len(), "content aggregated");
        walk.found
    }

    /// Content reachable from the list stored at `coordinate`.
    pub async fn collect_for(&self, coordinate: &Coordinate) -> Result<Vec<ContentId>> {
        if let Some(k) = coordinate.kind().filter(|k| !kind::is_list(*k)) {
            return Err(Error::NotAList(k));
        }
        let record = self
            .store
            .get_by_coordinate(coordinate)
            .await
            .ok_or_else(|| Error::NotFound(coordinate.to_string()))?;
        if !kind::is_list(record.event.kind) {
            return Err(Error::NotAList(record.event.kind));
        }
        let root = Arc::new(ListNode::new(&record.event, Vec::new()));
        Ok(self.collect(&[root]).await)
    }

    fn visit<'a>(
        &'a self,
        node: Arc<ListNode>,
        depth: usize,
        walk: &'a mut Walk,
    ) -> BoxFuture<'a, ()> {
        async move {
            if depth > self.max_depth || !walk.active.insert(node.coordinate.clone()) {
                return;
            }

            let mut deferred = Vec::new();
            for item in &node.items {
                match item {
                    Item::EventRef { id, .. } => walk.collect(ContentId::Event(id.clone())),
                    Item::AddressRef { coordinate, .. } => match coordinate.kind() {
                        Some(k) if kind::is_list(k) => deferred.push(coordinate.clone()),
                        Some(k) if kind::is_content(k) => {
                            walk.collect(ContentId::Address(coordinate.clone()))
                        }
                        _ => {}
                    },
                    Item::ProfileRef { .. } | Item::IdentityClaim { .. } => {}
                }
            }

            let structural: HashSet<&Coordinate> =
                node.children.iter().map(|c| &c.coordinate).collect();
            for child in &node.children {
                self.visit(child.clone(), depth + 1, walk).await;
            }

            for coordinate in deferred.iter().filter(|c| !structural.contains(c)) {
                if walk.active.contains(coordinate) {
                    continue;
                }
                let Some(record) = self.store.get_by_coordinate(coordinate).await else {
                    continue;
                };
                let referenced = Arc::new(ListNode::new(&record.event, Vec::new()));
                self.visit(referenced, depth + 1, walk).await;
            }

            walk.active.remove(&node.coordinate);
        }
        .boxed()
    }
}

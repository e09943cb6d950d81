//! Reconstruction of nested lists.
//!
//! Lists reference other lists through `a` tags. [`HierarchyBuilder`] turns a
//! flat set of root events into trees of [`ListNode`]s, resolving each child
//! address against the [`EventStore`].
//!
//! ## Guards
//!
//! - **Depth**: nodes deeper than `max_depth` (roots are depth 0) are pruned.
//! - **Cycles**: a coordinate already on the path from the root is dropped.
//!   The same list may still appear under independent branches.
//! - **Memoization**: a node finished during one build is reused, as the same
//!   [`Arc`], wherever it appears again at the same depth.

use crate::{
    config::EngineConfig,
    coordinate::Coordinate,
    item::{Item, DISPLAY_NAME_TAGS},
    kind,
    store::EventStore,
    Event, EventId, Kind, PublicKey, Timestamp,
};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// A list with its resolved sub-lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNode {
    pub coordinate: Coordinate,
    pub kind: Kind,
    pub event_id: EventId,
    pub author: PublicKey,
    pub created_at: Timestamp,
    pub display_name: String,
    pub item_count: usize,
    pub children: Vec<Arc<ListNode>>,
    pub items: Vec<Item>,
}

impl ListNode {
    /// A node for `event` with the given children.
    pub fn new(event: &Event, children: Vec<Arc<ListNode>>) -> Self {
        let items = Item::parse_all(event);
        Self {
            coordinate: event.coordinate(),
            kind: event.kind,
            event_id: event.id.clone(),
            author: event.author.clone(),
            created_at: event.created_at,
            display_name: display_name(event),
            item_count: items.len(),
            children,
            items,
        }
    }

    /// Coordinates of the sub-lists this node references, in tag order and
    /// without repeats.
    pub fn child_coordinates(&self) -> Vec<Coordinate> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::AddressRef { coordinate, .. } if item.list_kind().is_some() => {
                    Some(coordinate.clone())
                }
                _ => None,
            })
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// Depth of the deepest descendant below this node.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.height())
            .max()
            .unwrap_or(0)
    }
}

/// Human-readable name of a list: `title`, then `name`, then the `d`
/// identifier, then a label for the kind.
pub fn display_name(event: &Event) -> String {
    DISPLAY_NAME_TAGS
        .iter()
        .filter_map(|tag| event.first_tag_value(tag))
        .chain(event.d_tag())
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| kind::label(event.kind))
        .to_string()
}

type Memo = HashMap<(Coordinate, usize), Arc<ListNode>>;

/// Builds list trees from root events.
///
/// A build runs in two passes. The first fetches every reachable list from
/// the store one level at a time, each level's lookups running concurrently.
/// The second assembles the nodes from those events without touching the
/// store again.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    store: Arc<EventStore>,
    max_depth: usize,
}

impl HierarchyBuilder {
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

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Build one tree per distinct root list.
    ///
    /// Non-list events are ignored and, among roots sharing a coordinate,
    /// only the newest is used. Roots keep the order in which their
    /// coordinate first appears.
    pub async fn build(&self, roots: impl IntoIterator<Item = Event>) -> Vec<Arc<ListNode>> {
        let mut order: Vec<Coordinate> = Vec::new();
        let mut newest: HashMap<Coordinate, Event> = HashMap::new();
        for event in roots.into_iter().filter(|e| kind::is_list(e.kind)) {
            let coordinate = event.coordinate();
            match newest.get(&coordinate) {
                Some(current) if !event.supersedes(current) => {}
                Some(_) => {
                    newest.insert(coordinate, event);
                }
                None => {
                    order.push(coordinate.clone());
                    newest.insert(coordinate, event);
                }
            }
        }
        let roots: Vec<&Event> = order.iter().filter_map(|c| newest.get(c)).collect();

        let resolved = self.resolve(&roots).await;
        let mut memo = Memo::new();
        let mut path = HashSet::new();
        let nodes: Vec<_> = roots
            .into_iter()
            .filter_map(|event| self.assemble(event, 0, &mut path, &resolved, &mut memo))
            .collect();
        debug!(roots = nodes.len(), lists = resolved.len(), "hierarchy built");
        nodes
    }

    /// Build the trees of every list `author` has in the store.
    pub async fn build_for_author(&self, author: &str) -> Vec<Arc<ListNode>> {
        let roots = self
            .store
            .query(Some(&[author.to_string()]), Some(kind::LIST_KINDS))
            .await;
        self.build(roots.into_iter().map(|r| r.event)).await
    }

    /// Fetch every list reachable from `roots` within `max_depth` levels.
    ///
    /// Each coordinate is looked up at most once.
    async fn resolve(&self, roots: &[&Event]) -> HashMap<Coordinate, Event> {
        let mut resolved = HashMap::new();
        let mut requested = HashSet::new();
        let mut frontier: Vec<Coordinate> = roots
            .iter()
            .flat_map(|event| ListNode::new(event, Vec::new()).child_coordinates())
            .collect();

        for _ in 0..self.max_depth {
            frontier.retain(|c| requested.insert(c.clone()));
            if frontier.is_empty() {
                break;
            }
            let lookups = frontier.iter().map(|c| self.store.get_by_coordinate(c));
            let mut next = Vec::new();
            for record in join_all(lookups).await.into_iter().flatten() {
                let event = record.event;
                next.extend(ListNode::new(&event, Vec::new()).child_coordinates());
                resolved.insert(event.coordinate(), event);
            }
            frontier = next;
        }
        resolved
    }

    fn assemble(
        &self,
        event: &Event,
        depth: usize,
        path: &mut HashSet<Coordinate>,
        resolved: &HashMap<Coordinate, Event>,
        memo: &mut Memo,
    ) -> Option<Arc<ListNode>> {
        let coordinate = event.coordinate();
        if depth > self.max_depth {
            debug!(%coordinate, depth, max_depth = self.max_depth, "depth limit reached, pruning");
            return None;
        }
        if path.contains(&coordinate) {
            debug!(%coordinate, depth, "cycle detected, pruning");
            return None;
        }
        let key = (coordinate, depth);
        if let Some(node) = memo.get(&key) {
            return Some(node.clone());
        }

        let shell = ListNode::new(event, Vec::new());
        path.insert(key.0.clone());
        let mut children = Vec::new();
        for child in shell.child_coordinates() {
            let Some(child_event) = resolved.get(&child) else {
                continue;
            };
            if let Some(node) = self.assemble(child_event, depth + 1, path, resolved, memo) {
                children.push(node);
            }
        }
        path.remove(&key.0);

        let node = Arc::new(ListNode { children, ..shell });
        memo.insert(key, node.clone());
        Some(node)
    }
}

//! Edge case tests for listgraph-engine
//!
//! These tests cover boundary conditions and unusual inputs.

mod common;

use common::*;
use listgraph_engine::{
    ContentAggregator, ContentId, Coordinate, EngineConfig, Event, EventStore, FileBackend,
    HierarchyBuilder, Item, PublicationState, PutOutcome, StoreSnapshot, Tag, UnsignedEvent,
};
use std::sync::Arc;
use tempfile::TempDir;

fn child_ref(author: &str, d: &str) -> Tag {
    Tag::new(["a".to_string(), address(30000, author, d)])
}

async fn store_with(events: &[Event]) -> Arc<EventStore> {
    let store = Arc::new(EventStore::in_memory());
    for event in events {
        store.put(event.clone(), None).await.unwrap();
    }
    store
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[tokio::test]
async fn unicode_titles_and_identifiers() {
    let names = [
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
    ];
    let events: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            list(
                &alice(),
                30000,
                &format!("{name}-{i}"),
                vec![Tag::new(["title", *name])],
                100,
            )
        })
        .collect();
    let store = store_with(&events).await;

    for (event, name) in events.iter().zip(names) {
        assert!(event.verify().is_ok(), "Failed for: {name}");
        let record = store.get_by_coordinate(&event.coordinate()).await.unwrap();
        assert_eq!(record.event, *event);
    }

    let trees = HierarchyBuilder::new(store).build(events).await;
    let mut shown: Vec<_> = trees.iter().map(|n| n.display_name.clone()).collect();
    shown.sort();
    let mut expected: Vec<_> = names.iter().map(|n| n.to_string()).collect();
    expected.sort();
    assert_eq!(shown, expected);
}

#[tokio::test]
async fn identifier_with_colons_round_trips() {
    let event = list(&alice(), 30000, "a:b:c", vec![], 100);
    let coordinate = event.coordinate();
    assert_eq!(coordinate.d(), Some("a:b:c"));

    let parsed = Coordinate::parse(&coordinate.to_string()).unwrap();
    assert_eq!(parsed, coordinate);

    let store = store_with(&[event.clone()]).await;
    assert_eq!(
        store.get_by_coordinate(&parsed).await.unwrap().event.id,
        event.id
    );
}

#[tokio::test]
async fn empty_identifier_is_a_valid_address() {
    let event = list(&alice(), 30000, "", vec![Tag::new(["name", "Unnamed"])], 100);
    let store = store_with(&[event.clone()]).await;
    let coordinate = Coordinate::parse(&address(30000, &alice(), "")).unwrap();
    assert_eq!(
        store.get_by_coordinate(&coordinate).await.unwrap().event,
        event
    );
}

#[test]
fn whitespace_names_fall_back() {
    let event = list(
        &alice(),
        30003,
        "  ",
        vec![Tag::new(["title", "   "]), Tag::new(["name", ""])],
        100,
    );
    assert_eq!(listgraph_engine::hierarchy::display_name(&event), "Bookmark set");
}

#[test]
fn long_content_hashes_consistently() {
    let content = "x".repeat(1_000_000);
    let a = UnsignedEvent::new(alice(), 1, 1, vec![], content.clone());
    let b = UnsignedEvent::new(alice(), 1, 1, vec![], content);
    assert_eq!(a.compute_id(), b.compute_id());
    assert_eq!(a.compute_id().len(), 64);
}

// ============================================================================
// Timestamp Edge Cases
// ============================================================================

#[tokio::test]
async fn timestamp_boundaries() {
    let store = EventStore::in_memory();
    let zero = list(&alice(), 30000, "x", vec![], 0);
    let max = list(&alice(), 30000, "x", vec![], u64::MAX);

    assert_eq!(store.put(zero, None).await.unwrap(), PutOutcome::Inserted);
    assert_eq!(store.put(max.clone(), None).await.unwrap(), PutOutcome::Replaced);
    assert_eq!(store.latest_timestamp_for(&alice()).await, Some(u64::MAX));
    assert_eq!(store.get_by_id(&max.id).await, Some(max));
}

#[tokio::test]
async fn identical_timestamps_pick_the_same_winner_everywhere() {
    let versions: Vec<_> = (0..20)
        .map(|i| {
            list(
                &alice(),
                30000,
                "x",
                vec![Tag::new(["p".to_string(), key('c'), i.to_string()])],
                500,
            )
        })
        .collect();
    let smallest = versions.iter().map(|e| e.id.clone()).min().unwrap();

    let forward = store_with(&versions).await;
    let mut reversed = versions.clone();
    reversed.reverse();
    let backward = store_with(&reversed).await;

    let coordinate = versions[0].coordinate();
    for store in [forward, backward] {
        assert_eq!(
            store.get_by_coordinate(&coordinate).await.unwrap().event.id,
            smallest
        );
    }
}

// ============================================================================
// List Edge Cases
// ============================================================================

#[tokio::test]
async fn empty_list_builds_a_leaf() {
    let event = list(&alice(), 30000, "empty", vec![], 100);
    let store = store_with(&[event.clone()]).await;

    let trees = HierarchyBuilder::new(store.clone()).build([event]).await;
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].item_count, 0);
    assert!(trees[0].children.is_empty());
    assert!(ContentAggregator::new(store).collect(&trees).await.is_empty());
}

#[tokio::test]
async fn large_list_keeps_item_order() {
    let tags: Vec<_> = (0..5_000u32)
        .map(|i| Tag::new(["e".to_string(), format!("{i:064x}")]))
        .collect();
    let event = list(&alice(), 30003, "big", tags, 100);
    let store = store_with(&[event.clone()]).await;

    let content = ContentAggregator::new(store)
        .collect_for(&event.coordinate())
        .await
        .unwrap();
    assert_eq!(content.len(), 5_000);
    assert_eq!(content[0], ContentId::Event(format!("{:064x}", 0)));
    assert_eq!(content[4_999], ContentId::Event(format!("{:064x}", 4_999)));
}

#[tokio::test]
async fn malformed_tags_are_ignored() {
    let event = list(
        &alice(),
        30000,
        "odd",
        vec![
            Tag::new(["p"]),
            Tag::new(["a", "not-a-coordinate"]),
            Tag::new(["x-unknown", "value"]),
            Tag(vec![]),
            Tag::new(["p", key('c').as_str()]),
        ],
        100,
    );
    let items = Item::parse_all(&event);
    assert_eq!(items.len(), 1);
    assert!(matches!(&items[0], Item::ProfileRef { pubkey, .. } if *pubkey == key('c')));
}

#[tokio::test]
async fn deep_chain_is_cut_at_configured_depth() {
    let chain: Vec<_> = (0..20)
        .map(|i| {
            list(
                &alice(),
                30000,
                &format!("level-{i}"),
                vec![child_ref(&alice(), &format!("level-{}", i + 1))],
                100,
            )
        })
        .collect();
    let store = store_with(&chain).await;

    let config = EngineConfig::default();
    let trees = HierarchyBuilder::with_config(store.clone(), &config)
        .build([chain[0].clone()])
        .await;
    assert_eq!(trees[0].height(), config.max_depth);
    assert_eq!(trees[0].size(), config.max_depth + 1);

    let shallow = HierarchyBuilder::new(store).with_max_depth(0).build([chain[0].clone()]).await;
    assert_eq!(shallow[0].size(), 1);
}

#[tokio::test]
async fn long_cycle_terminates() {
    let ring: Vec<_> = (0..4)
        .map(|i| {
            list(
                &alice(),
                30000,
                &format!("r{i}"),
                vec![child_ref(&alice(), &format!("r{}", (i + 1) % 4))],
                100,
            )
        })
        .collect();
    let store = store_with(&ring).await;

    let trees = HierarchyBuilder::new(store.clone()).build(ring.clone()).await;
    assert_eq!(trees.len(), 4);
    for tree in &trees {
        assert_eq!(tree.size(), 4);
    }
    let content = ContentAggregator::new(store).collect(&trees).await;
    assert!(content.is_empty());
}

#[tokio::test]
async fn missing_children_are_skipped() {
    let parent = list(
        &alice(),
        30000,
        "parent",
        vec![child_ref(&bob(), "gone"), child_ref(&alice(), "here")],
        100,
    );
    let here = list(&alice(), 30000, "here", vec![], 100);
    let store = store_with(&[parent.clone(), here]).await;

    let trees = HierarchyBuilder::new(store).build([parent]).await;
    assert_eq!(trees[0].children.len(), 1);
    assert_eq!(trees[0].children[0].display_name, "here");
    assert_eq!(trees[0].item_count, 2);
}

// ============================================================================
// Persistence Edge Cases
// ============================================================================

#[tokio::test]
async fn file_backend_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let first = list(&alice(), 30000, "x", vec![], 100);
    let second = list(&alice(), 30000, "x", vec![Tag::new(["title", "X"])], 200);
    let profile = signed(UnsignedEvent::new(alice(), 0, 50, vec![], r#"{"name":"alice"}"#));

    {
        let store = EventStore::open(Arc::new(FileBackend::open(dir.path()).unwrap())).unwrap();
        store.put(first, None).await.unwrap();
        store
            .put(second.clone(), Some(PublicationState::Unpublished))
            .await
            .unwrap();
        store.put(profile, Some(PublicationState::Published)).await.unwrap();
    }

    let store = EventStore::open(Arc::new(FileBackend::open(dir.path()).unwrap())).unwrap();
    assert_eq!(store.len().await, 2);
    let record = store.get_by_coordinate(&second.coordinate()).await.unwrap();
    assert_eq!(record.event, second);
    assert_eq!(record.publication_state, PublicationState::Unpublished);
    assert_eq!(
        store.get_profile(&alice()).await.unwrap().best_name(),
        Some("alice")
    );
}

#[tokio::test]
async fn file_backend_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    let bucket = dir.path().join("events").join("ab").join("cd");
    std::fs::create_dir_all(&bucket).unwrap();
    std::fs::write(bucket.join(format!("abcd{}.json", "0".repeat(60))), "{ not json").unwrap();

    assert!(EventStore::open(Arc::new(backend)).is_err());
}

#[tokio::test]
async fn empty_snapshot_round_trip() {
    let store = EventStore::in_memory();
    let snapshot = store.export_snapshot().await;
    assert_eq!(snapshot.record_count(), 0);

    let restored = StoreSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
    let other = EventStore::in_memory();
    assert_eq!(other.import_snapshot(restored).await.unwrap(), 0);
    assert!(other.is_empty().await);
}

#[tokio::test]
async fn snapshot_import_keeps_newer_local_state() {
    let old = list(&alice(), 30000, "x", vec![], 100);
    let new = list(&alice(), 30000, "x", vec![], 200);

    let source = store_with(&[old]).await;
    let snapshot = source.export_snapshot().await;

    let target = store_with(&[new.clone()]).await;
    assert_eq!(target.import_snapshot(snapshot).await.unwrap(), 0);
    assert_eq!(
        target.get_by_coordinate(&new.coordinate()).await.unwrap().event,
        new
    );
}

// ============================================================================
// Concurrent Operations
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_converge() {
    let store = Arc::new(EventStore::in_memory());
    let versions: Vec<_> = (0..50)
        .map(|i| list(&alice(), 30000, "x", vec![], 1_000 + (i % 7)))
        .collect();
    let winner = versions
        .iter()
        .max_by(|a, b| a.version().cmp(&b.version()))
        .cloned()
        .unwrap();

    let tasks: Vec<_> = versions
        .into_iter()
        .map(|event| {
            let store = store.clone();
            tokio::spawn(async move { store.put(event, None).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.len().await, 1);
    assert_eq!(
        store.get_by_coordinate(&winner.coordinate()).await.unwrap().event,
        winner
    );
}

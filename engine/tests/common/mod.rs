//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use listgraph_engine::{
    Event, EventId, Filter, GatewayError, Profile, RelayGateway, Signer, SignerError,
    StorageBackend, StorageError, StorageRecord, StoreSnapshot, Tag, Timestamp, UnsignedEvent,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

pub const RELAY: &str = "wss://relay.test";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 64-char hex key made of `c`.
pub fn key(c: char) -> String {
    c.to_string().repeat(64)
}

pub fn alice() -> String {
    key('a')
}

pub fn bob() -> String {
    key('b')
}

/// Attach a well-formed (not cryptographically valid) signature.
pub fn signed(unsigned: UnsignedEvent) -> Event {
    Event::from_unsigned(unsigned, "5".repeat(128))
}

/// A signed list event with a `d` tag followed by `tags`.
pub fn list(author: &str, kind: u16, d: &str, tags: Vec<Tag>, created_at: Timestamp) -> Event {
    let mut all = vec![Tag::new(["d", d])];
    all.extend(tags);
    signed(UnsignedEvent::new(author, kind, created_at, all, ""))
}

pub fn note(author: &str, content: &str, created_at: Timestamp) -> Event {
    signed(UnsignedEvent::new(author, 1, created_at, vec![], content))
}

pub fn address(kind: u16, author: &str, d: &str) -> String {
    format!("{kind}:{author}:{d}")
}

/// How the mock gateway answers a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishBehaviour {
    Accept,
    NobodyAccepts,
    Fail,
}

/// An in-memory relay.
#[derive(Debug, Default)]
pub struct MockGateway {
    remote: Mutex<Vec<Event>>,
    published: Mutex<Vec<Event>>,
    filters: Mutex<Vec<Filter>>,
    behaviour: Mutex<HashMap<EventId, PublishBehaviour>>,
    publish_all: Mutex<Option<PublishBehaviour>>,
    failing_fetches: AtomicU32,
    ignore_filters: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(events: impl IntoIterator<Item = Event>) -> Self {
        let gateway = Self::new();
        gateway.remote.lock().unwrap().extend(events);
        gateway
    }

    /// Fail the next `n` fetches.
    pub fn fail_fetches(&self, n: u32) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    /// Answer every fetch with all remote events, like a relay that
    /// ignores filters.
    pub fn ignore_filters(&self) {
        self.ignore_filters.store(true, Ordering::SeqCst);
    }

    pub fn set_behaviour(&self, id: &str, behaviour: PublishBehaviour) {
        self.behaviour
            .lock()
            .unwrap()
            .insert(id.to_string(), behaviour);
    }

    pub fn set_default_behaviour(&self, behaviour: PublishBehaviour) {
        *self.publish_all.lock().unwrap() = Some(behaviour);
    }

    pub fn published(&self) -> Vec<Event> {
        self.published.lock().unwrap().clone()
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.filters.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.filters.lock().unwrap().len()
    }
}

#[async_trait]
impl RelayGateway for MockGateway {
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>, GatewayError> {
        self.filters.lock().unwrap().push(filter.clone());
        let remaining = self.failing_fetches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_fetches.store(remaining - 1, Ordering::SeqCst);
            return Err(GatewayError::Unavailable("mock relay down".into()));
        }
        let mut events: Vec<Event> = self
            .remote
            .lock()
            .unwrap()
            .iter()
            .filter(|e| self.ignore_filters.load(Ordering::SeqCst) || filter.matches(e))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            events.truncate(limit);
        }
        Ok(events)
    }

    async fn publish(&self, event: &Event) -> Result<HashSet<String>, GatewayError> {
        let behaviour = self
            .behaviour
            .lock()
            .unwrap()
            .get(&event.id)
            .copied()
            .or(*self.publish_all.lock().unwrap())
            .unwrap_or(PublishBehaviour::Accept);
        match behaviour {
            PublishBehaviour::Accept => {
                self.published.lock().unwrap().push(event.clone());
                self.remote.lock().unwrap().push(event.clone());
                Ok(HashSet::from([RELAY.to_string()]))
            }
            PublishBehaviour::NobodyAccepts => Ok(HashSet::new()),
            PublishBehaviour::Fail => Err(GatewayError::Rejected("blocked: test".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerMode {
    Sign,
    Decline,
    /// Rewrites the `d` tag before signing
    ChangeIdentity,
}

/// Signs with a fixed, well-formed signature.
#[derive(Debug)]
pub struct MockSigner {
    mode: Mutex<SignerMode>,
    calls: AtomicU32,
    yielding: AtomicBool,
}

impl Default for MockSigner {
    fn default() -> Self {
        Self {
            mode: Mutex::new(SignerMode::Sign),
            calls: AtomicU32::new(0),
            yielding: AtomicBool::new(false),
        }
    }
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: SignerMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Yield to the runtime before answering, so concurrent callers
    /// interleave.
    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign(&self, mut unsigned: UnsignedEvent) -> Result<Event, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let mode = *self.mode.lock().unwrap();
        match mode {
            SignerMode::Sign => Ok(signed(unsigned)),
            SignerMode::Decline => Err(SignerError::Declined),
            SignerMode::ChangeIdentity => {
                for tag in unsigned.tags.iter_mut() {
                    if tag.name() == Some("d") {
                        *tag = Tag::new(["d", "hijacked"]);
                    }
                }
                Ok(signed(unsigned))
            }
        }
    }
}

/// A backend whose writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyBackend {
    failing: AtomicBool,
}

impl FlakyBackend {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Io("disk unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for FlakyBackend {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        Ok(StoreSnapshot::new())
    }

    fn save_record(&self, _record: &StorageRecord) -> Result<(), StorageError> {
        self.check()
    }

    fn remove_record(&self, _id: &str) -> Result<(), StorageError> {
        self.check()
    }

    fn save_profile(&self, _profile: &Profile) -> Result<(), StorageError> {
        self.check()
    }

    fn remove_profile(&self, _author: &str) -> Result<(), StorageError> {
        self.check()
    }
}

//! Signed event model.
//!
//! Events are immutable and content-addressed: the id is the SHA-256 of the
//! canonical array `[0, pubkey, created_at, kind, tags, content]`, so any edit
//! yields a different id.

use crate::{
    coordinate::Coordinate, error::Result, version::EventVersion, Error, EventId, Kind, PublicKey,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A tag expressed as an array of strings.
///
/// The first element names the tag (`p`, `e`, `a`, `d`, `title`, ...) and
/// the rest carry its values. Tags are stored verbatim so unknown tags
/// survive every rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Build a tag from its name and values.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(fields.into_iter().map(Into::into).collect())
    }

    /// Tag name, e.g. `"p"`.
    pub fn name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// First value after the name.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// Value at `index` (0 is the name).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Identity used for deduplication: `(name, first value)`.
    pub fn key(&self) -> Option<(&str, &str)> {
        Some((self.name()?, self.value()?))
    }
}

/// A signed event as persisted locally and exchanged with relays.
///
/// ```json
/// {
///   "id": "5c83...",
///   "pubkey": "f7234bd4c1...",
///   "kind": 30000,
///   "created_at": 1700000000,
///   "tags": [["d", "friends"], ["title", "Friends"], ["p", "82341f88..."]],
///   "content": "",
///   "sig": "908a15e4..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Hex SHA-256 of the canonical serialization.
    pub id: EventId,
    /// Author public key (hex).
    #[serde(rename = "pubkey")]
    pub author: PublicKey,
    /// Kind number.
    pub kind: Kind,
    /// Unix timestamp in seconds.
    pub created_at: Timestamp,
    pub tags: Vec<Tag>,
    pub content: String,
    /// Schnorr signature over the id (hex).
    pub sig: String,
}

impl Event {
    /// Attach an id and signature to an unsigned event.
    ///
    /// The id is always recomputed from the fields; signers only provide
    /// the signature.
    pub fn from_unsigned(unsigned: UnsignedEvent, sig: impl Into<String>) -> Self {
        let id = unsigned.compute_id();
        Self {
            id,
            author: unsigned.author,
            kind: unsigned.kind,
            created_at: unsigned.created_at,
            tags: unsigned.tags,
            content: unsigned.content,
            sig: sig.into(),
        }
    }

    /// Logical identity of this event.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::of(self)
    }

    /// Ordering key for last-write-wins.
    pub fn version(&self) -> EventVersion<'_> {
        EventVersion::new(self.created_at, &self.id)
    }

    /// Whether this event replaces `other` under last-write-wins.
    pub fn supersedes(&self, other: &Event) -> bool {
        self.version() > other.version()
    }

    /// Value of the first `d` tag, if any.
    pub fn d_tag(&self) -> Option<&str> {
        self.first_tag_value("d")
    }

    /// Value of the first tag named `name`.
    pub fn first_tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name() == Some(name))
            .and_then(Tag::value)
    }

    /// The same event with its id and signature stripped.
    pub fn to_unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            author: self.author.clone(),
            kind: self.kind,
            created_at: self.created_at,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Check that the id matches the content and the signature is present
    /// and shaped like a 64-byte Schnorr signature.
    ///
    /// Cryptographic verification belongs to the signer; this only catches
    /// records that were never signed or were altered after signing.
    pub fn verify(&self) -> Result<()> {
        if !is_hex(&self.author, 64) {
            return Err(Error::InvalidEvent(format!(
                "{}: malformed author key",
                self.id
            )));
        }
        let expected = self.to_unsigned().compute_id();
        if expected != self.id {
            return Err(Error::InvalidEvent(format!(
                "{}: id does not match content (expected {expected})",
                self.id
            )));
        }
        if !is_hex(&self.sig, 128) {
            return Err(Error::InvalidEvent(format!(
                "{}: missing or malformed signature",
                self.id
            )));
        }
        Ok(())
    }
}

/// Event fields prepared for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    #[serde(rename = "pubkey")]
    pub author: PublicKey,
    pub kind: Kind,
    pub created_at: Timestamp,
    pub tags: Vec<Tag>,
    pub content: String,
}

impl UnsignedEvent {
    /// Create a new unsigned event.
    pub fn new(
        author: impl Into<PublicKey>,
        kind: Kind,
        created_at: Timestamp,
        tags: Vec<Tag>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            kind,
            created_at,
            tags,
            content: content.into(),
        }
    }

    /// Hash of the canonical serialization, hex encoded.
    pub fn compute_id(&self) -> EventId {
        let canonical = serde_json::json!([
            0,
            self.author,
            self.created_at,
            self.kind,
            self.tags,
            self.content
        ]);
        // Serializing a `Value` built from strings and integers cannot fail.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// Whether `s` is exactly `len` lowercase hex characters.
pub(crate) fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

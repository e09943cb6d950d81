//! Logical identities used for replaceable-set membership.

use crate::{
    error::Result,
    event::{is_hex, Event},
    kind::KindClass,
    Error, EventId, Kind, PublicKey,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The key under which at most one version of an event is stored.
///
/// - regular kinds: the event id
/// - replaceable kinds: `(kind, author)`
/// - parameterized-replaceable kinds: `(kind, author, d)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Coordinate {
    Id(EventId),
    Replaceable {
        kind: Kind,
        author: PublicKey,
    },
    Parameterized {
        kind: Kind,
        author: PublicKey,
        d: String,
    },
}

impl Coordinate {
    /// Compute the coordinate of an event.
    ///
    /// A parameterized event without a `d` tag lives at `d = ""`.
    pub fn of(event: &Event) -> Self {
        match KindClass::of(event.kind) {
            KindClass::Replaceable => Coordinate::Replaceable {
                kind: event.kind,
                author: event.author.clone(),
            },
            KindClass::ParameterizedReplaceable => Coordinate::Parameterized {
                kind: event.kind,
                author: event.author.clone(),
                d: event.d_tag().unwrap_or_default().to_string(),
            },
            KindClass::Regular | KindClass::Ephemeral => Coordinate::Id(event.id.clone()),
        }
    }

    /// Parse an address of the form `kind:pubkey:d`.
    ///
    /// The kind must be replaceable and the author a 64-char hex key. For
    /// standard-replaceable kinds the `d` part is ignored (`kind:pubkey:` is
    /// the canonical form). Ids are not accepted here; use [`Coordinate::Id`].
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidCoordinate(format!("{input:?}: {why}"));
        let mut parts = input.splitn(3, ':');
        let kind = parts
            .next()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| invalid("missing kind"))?
            .parse::<Kind>()
            .map_err(|_| invalid("kind is not a number"))?;
        let author = parts.next().ok_or_else(|| invalid("missing author"))?;
        if !is_hex(author, 64) {
            return Err(invalid("author is not a 64-char hex key"));
        }
        let d = parts.next();
        match KindClass::of(kind) {
            KindClass::Replaceable => Ok(Coordinate::Replaceable {
                kind,
                author: author.to_string(),
            }),
            KindClass::ParameterizedReplaceable => Ok(Coordinate::Parameterized {
                kind,
                author: author.to_string(),
                d: d.ok_or_else(|| invalid("missing d identifier"))?.to_string(),
            }),
            _ => Err(invalid("kind is not replaceable")),
        }
    }

    /// Kind encoded in the coordinate, if it is an address.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Coordinate::Id(_) => None,
            Coordinate::Replaceable { kind, .. } | Coordinate::Parameterized { kind, .. } => {
                Some(*kind)
            }
        }
    }

    /// Author encoded in the coordinate, if it is an address.
    pub fn author(&self) -> Option<&str> {
        match self {
            Coordinate::Id(_) => None,
            Coordinate::Replaceable { author, .. } | Coordinate::Parameterized { author, .. } => {
                Some(author)
            }
        }
    }

    /// The `d` identifier of a parameterized coordinate.
    pub fn d(&self) -> Option<&str> {
        match self {
            Coordinate::Parameterized { d, .. } => Some(d),
            _ => None,
        }
    }

    /// Whether this coordinate is shared across versions.
    pub fn is_address(&self) -> bool {
        !matches!(self, Coordinate::Id(_))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Id(id) => write!(f, "{id}"),
            Coordinate::Replaceable { kind, author } => write!(f, "{kind}:{author}:"),
            Coordinate::Parameterized { kind, author, d } => write!(f, "{kind}:{author}:{d}"),
        }
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Coordinate::parse(s)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if is_hex(&s, 64) {
            return Ok(Coordinate::Id(s));
        }
        Coordinate::parse(&s).map_err(serde::de::Error::custom)
    }
}

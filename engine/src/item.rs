//! Typed list items.
//!
//! Lists carry their members as tags. [`Item::from_tag`] is the one place
//! where raw tag arrays become typed references; everything downstream works
//! with [`Item`] values.

use crate::{
    coordinate::Coordinate,
    event::{is_hex, Event, Tag},
    kind, EventId, Kind, PublicKey,
};
use serde::{Deserialize, Serialize};

/// Tag names that hold the human-readable name of a list.
pub const DISPLAY_NAME_TAGS: &[&str] = &["title", "name"];

/// A member of a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    /// `["p", <pubkey>, <relay>?, <petname>?]`
    #[serde(rename_all = "camelCase")]
    ProfileRef {
        pubkey: PublicKey,
        relay_hint: Option<String>,
        petname: Option<String>,
    },
    /// `["e", <id>, <relay>?]`
    #[serde(rename_all = "camelCase")]
    EventRef {
        id: EventId,
        relay_hint: Option<String>,
    },
    /// `["a", "<kind>:<pubkey>:<d>", <relay>?]`
    #[serde(rename_all = "camelCase")]
    AddressRef {
        coordinate: Coordinate,
        relay_hint: Option<String>,
    },
    /// `["nip05", <identifier>, <pubkey>]`
    #[serde(rename_all = "camelCase")]
    IdentityClaim {
        identifier: String,
        pubkey_hint: PublicKey,
    },
}

impl Item {
    /// Parse a tag into an item.
    ///
    /// Returns `None` for metadata tags (`d`, `title`, `t`, ...) and for
    /// reference tags whose value is malformed.
    pub fn from_tag(tag: &Tag) -> Option<Self> {
        let hint = |i: usize| tag.get(i).filter(|s| !s.is_empty()).map(str::to_string);
        match tag.name()? {
            "p" => {
                let pubkey = tag.value().filter(|v| is_hex(v, 64))?;
                Some(Item::ProfileRef {
                    pubkey: pubkey.to_string(),
                    relay_hint: hint(2),
                    petname: hint(3),
                })
            }
            "e" => {
                let id = tag.value().filter(|v| is_hex(v, 64))?;
                Some(Item::EventRef {
                    id: id.to_string(),
                    relay_hint: hint(2),
                })
            }
            "a" => {
                let coordinate = Coordinate::parse(tag.value()?).ok()?;
                Some(Item::AddressRef {
                    coordinate,
                    relay_hint: hint(2),
                })
            }
            "nip05" => {
                let identifier = tag.value().filter(|v| !v.trim().is_empty())?;
                let pubkey = tag.get(2).filter(|v| is_hex(v, 64))?;
                Some(Item::IdentityClaim {
                    identifier: identifier.to_string(),
                    pubkey_hint: pubkey.to_string(),
                })
            }
            _ => None,
        }
    }

    /// All items of an event, in tag order.
    pub fn parse_all(event: &Event) -> Vec<Item> {
        event.tags.iter().filter_map(Item::from_tag).collect()
    }

    /// Render back into a tag.
    pub fn to_tag(&self) -> Tag {
        let mut fields = vec![self.tag_name().to_string(), self.value()];
        match self {
            Item::ProfileRef {
                relay_hint,
                petname,
                ..
            } => {
                if relay_hint.is_some() || petname.is_some() {
                    fields.push(relay_hint.clone().unwrap_or_default());
                }
                if let Some(petname) = petname {
                    fields.push(petname.clone());
                }
            }
            Item::EventRef { relay_hint, .. } | Item::AddressRef { relay_hint, .. } => {
                if let Some(relay) = relay_hint {
                    fields.push(relay.clone());
                }
            }
            Item::IdentityClaim { pubkey_hint, .. } => fields.push(pubkey_hint.clone()),
        }
        Tag(fields)
    }

    /// Name of the tag this item is stored under.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Item::ProfileRef { .. } => "p",
            Item::EventRef { .. } => "e",
            Item::AddressRef { .. } => "a",
            Item::IdentityClaim { .. } => "nip05",
        }
    }

    /// First tag value: the key, id, coordinate or identifier.
    pub fn value(&self) -> String {
        match self {
            Item::ProfileRef { pubkey, .. } => pubkey.clone(),
            Item::EventRef { id, .. } => id.clone(),
            Item::AddressRef { coordinate, .. } => coordinate.to_string(),
            Item::IdentityClaim { identifier, .. } => identifier.clone(),
        }
    }

    /// Whether `tag` stores this same item, ignoring hints.
    ///
    /// Tags are compared by what they reference, so `10000:<pk>` and
    /// `10000:<pk>:` name the same list.
    pub fn matches_tag(&self, tag: &Tag) -> bool {
        let value = self.value();
        match Item::from_tag(tag) {
            Some(other) => other.tag_name() == self.tag_name() && other.value() == value,
            None => tag.key() == Some((self.tag_name(), value.as_str())),
        }
    }

    /// Kind of the referenced list, when this item points at a list.
    pub fn list_kind(&self) -> Option<Kind> {
        match self {
            Item::AddressRef { coordinate, .. } => coordinate.kind().filter(|k| kind::is_list(*k)),
            _ => None,
        }
    }
}

/// A reference produced by an identifier resolver from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedReference {
    Profile {
        pubkey: PublicKey,
        relay_hint: Option<String>,
    },
    Event {
        id: EventId,
        relay_hint: Option<String>,
        /// Kind, when the encoding carried it.
        kind: Option<Kind>,
    },
    Address {
        coordinate: Coordinate,
        relay_hint: Option<String>,
    },
    /// An identity claim (`name@domain`) still to be looked up.
    IdentityClaim { identifier: String },
}

//! Event kind classification.
//!
//! The kind number decides how an event is keyed in the store (by id, by
//! `(kind, author)` or by `(kind, author, d)`) and whether it describes a
//! list, a profile or plain content.

use crate::Kind;
use serde::{Deserialize, Serialize};

/// Profile metadata (`kind:0`).
pub const PROFILE: Kind = 0;
/// Follow list (`kind:3`).
pub const FOLLOWS: Kind = 3;
/// Deletion request (`kind:5`).
pub const DELETION: Kind = 5;
/// Generic people set (`kind:30000`).
pub const FOLLOW_SET: Kind = 30000;
/// Bookmark set (`kind:30003`).
pub const BOOKMARK_SET: Kind = 30003;
/// Follow pack / starter pack (`kind:39089`).
pub const FOLLOW_PACK: Kind = 39089;

/// Every kind treated as a list by the hierarchy and mutation layers.
pub const LIST_KINDS: &[Kind] = &[
    FOLLOWS,
    10000, // mute list
    10001, // pinned notes
    10003, // bookmarks
    10004, // communities
    10005, // public chats
    10015, // interests
    10030, // emojis
    FOLLOW_SET,
    30001, // generic lists (deprecated, still seen in the wild)
    30002, // relay sets
    BOOKMARK_SET,
    30004, // article curation sets
    30005, // video curation sets
    30015, // interest sets
    30030, // emoji sets
    FOLLOW_PACK,
];

/// How the store keys events of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KindClass {
    /// Keyed by event id; never superseded.
    Regular,
    /// Keyed by `(kind, author)`.
    Replaceable,
    /// Not meant to be stored by relays; kept by id like regular events.
    Ephemeral,
    /// Keyed by `(kind, author, d)`.
    ParameterizedReplaceable,
}

impl KindClass {
    /// Classify a kind number.
    pub fn of(kind: Kind) -> Self {
        match kind {
            0 | 3 => KindClass::Replaceable,
            10_000..=19_999 => KindClass::Replaceable,
            20_000..=29_999 => KindClass::Ephemeral,
            30_000..=39_999 => KindClass::ParameterizedReplaceable,
            _ => KindClass::Regular,
        }
    }

    /// Whether a later event can supersede an earlier one.
    pub fn is_replaceable(self) -> bool {
        matches!(
            self,
            KindClass::Replaceable | KindClass::ParameterizedReplaceable
        )
    }
}

/// Whether events of this kind can be superseded by a newer version.
pub fn is_replaceable(kind: Kind) -> bool {
    KindClass::of(kind).is_replaceable()
}

/// Whether events of this kind are lists.
pub fn is_list(kind: Kind) -> bool {
    LIST_KINDS.contains(&kind)
}

/// Content kinds are everything that is neither a list nor a profile.
pub fn is_content(kind: Kind) -> bool {
    kind != PROFILE && !is_list(kind)
}

/// Fallback display label when a list carries no name of its own.
pub fn label(kind: Kind) -> &'static str {
    match kind {
        FOLLOWS => "Follows",
        10000 => "Mute list",
        10001 => "Pinned notes",
        10003 => "Bookmarks",
        10004 => "Communities",
        10005 => "Public chats",
        10015 => "Interests",
        10030 => "Emojis",
        FOLLOW_SET => "Follow set",
        30001 => "List",
        30002 => "Relay set",
        BOOKMARK_SET => "Bookmark set",
        30004 => "Article curation",
        30005 => "Video curation",
        30015 => "Interest set",
        30030 => "Emoji set",
        FOLLOW_PACK => "Follow pack",
        _ => "Untitled list",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_ranges() {
        assert_eq!(KindClass::of(0), KindClass::Replaceable);
        assert_eq!(KindClass::of(1), KindClass::Regular);
        assert_eq!(KindClass::of(3), KindClass::Replaceable);
        assert_eq!(KindClass::of(5), KindClass::Regular);
        assert_eq!(KindClass::of(9_999), KindClass::Regular);
        assert_eq!(KindClass::of(10_000), KindClass::Replaceable);
        assert_eq!(KindClass::of(19_999), KindClass::Replaceable);
        assert_eq!(KindClass::of(20_000), KindClass::Ephemeral);
        assert_eq!(KindClass::of(30_000), KindClass::ParameterizedReplaceable);
        assert_eq!(KindClass::of(39_999), KindClass::ParameterizedReplaceable);
        assert_eq!(KindClass::of(40_000), KindClass::Regular);
    }

    #[test]
    fn ephemeral_is_not_replaceable() {
        assert!(!is_replaceable(20_001));
        assert!(is_replaceable(10_002));
        assert!(is_replaceable(30_023));
    }

    #[test]
    fn lists_profiles_and_content() {
        assert!(is_list(FOLLOW_SET));
        assert!(is_list(FOLLOWS));
        assert!(!is_list(30_023));
        assert!(is_content(1));
        assert!(is_content(30_023));
        assert!(!is_content(PROFILE));
        assert!(!is_content(BOOKMARK_SET));
    }

    #[test]
    fn every_list_kind_is_replaceable() {
        for kind in LIST_KINDS {
            assert!(is_replaceable(*kind), "kind {kind} should be replaceable");
        }
    }

    #[test]
    fn labels() {
        assert_eq!(label(FOLLOW_PACK), "Follow pack");
        assert_eq!(label(12_345), "Untitled list");
    }
}

//! Version ordering for last-write-wins.
//!
//! The version provides a total ordering across all versions of a
//! coordinate, which is essential for deterministic replacement.

use crate::Timestamp;
use std::cmp::Ordering;

/// The ordering key of one event version.
///
/// Ordering rules (greater = newer):
/// 1. Higher `created_at` wins
/// 2. If timestamps are equal, the lexicographically *smaller* id wins
///
/// Every replica picks the same survivor regardless of arrival order,
/// even when two versions were signed in the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventVersion<'a> {
    pub created_at: Timestamp,
    pub id: &'a str,
}

impl<'a> EventVersion<'a> {
    pub fn new(created_at: Timestamp, id: &'a str) -> Self {
        Self { created_at, id }
    }
}

impl Ord for EventVersion<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.created_at.cmp(&other.created_at) {
            Ordering::Equal => other.id.cmp(self.id),
            other => other,
        }
    }
}

impl PartialOrd for EventVersion<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_by_timestamp() {
        let older = EventVersion::new(1000, "ffff");
        let newer = EventVersion::new(1005, "0000");
        assert!(older < newer);
    }

    #[test]
    fn smaller_id_wins_on_equal_timestamp() {
        let a = EventVersion::new(1000, "aaaa");
        let b = EventVersion::new(1000, "bbbb");
        assert!(a > b);
        assert_eq!(a.max(b), a);
        assert_eq!(b.max(a), a);
    }

    #[test]
    fn identical_versions_are_equal() {
        let a = EventVersion::new(7, "abcd");
        let b = EventVersion::new(7, "abcd");
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }
}

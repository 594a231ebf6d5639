//! Change-tracking cursor types.
//!
//! A cursor marks the last processed position in the change stream of one
//! entity type. Positions are totally ordered by `(modified_at, id)`, so rows
//! that share a timestamp are still visited exactly once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The entity types whose changes are tracked with their own cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A person (actor, director, writer).
    Person,
    /// A genre.
    Genre,
    /// A movie (the fact entity).
    Movie,
}

impl EntityKind {
    /// All tracked kinds, in the order a sync cycle scans them.
    pub const ALL: [EntityKind; 3] = [EntityKind::Person, EntityKind::Genre, EntityKind::Movie];

    /// Lowercase name used in persisted state keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Genre => "genre",
            EntityKind::Movie => "movie",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the change stream of one entity type.
///
/// The derived ordering compares `modified_at` first and `id` second, which is
/// exactly the order used by change scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub modified_at: DateTime<Utc>,
    pub id: Uuid,
}

impl Cursor {
    /// Create a cursor at the given position.
    pub fn new(modified_at: DateTime<Utc>, id: Uuid) -> Self {
        Self { modified_at, id }
    }

    /// The seed position used before the first cycle: the Unix epoch with the nil id.
    ///
    /// # Example
    ///
    /// ```
    /// use movies_indexer_shared::Cursor;
    ///
    /// let seed = Cursor::epoch();
    /// assert_eq!(seed.modified_at.timestamp(), 0);
    /// assert!(seed.id.is_nil());
    /// ```
    pub fn epoch() -> Self {
        Self {
            modified_at: DateTime::<Utc>::UNIX_EPOCH,
            id: Uuid::nil(),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.modified_at.to_rfc3339(), self.id)
    }
}

/// Minimal row shape returned by change scans and fan-out lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangedRecord {
    pub id: Uuid,
    pub modified_at: DateTime<Utc>,
}

impl ChangedRecord {
    pub fn new(id: Uuid, modified_at: DateTime<Utc>) -> Self {
        Self { id, modified_at }
    }

    /// The cursor position of this record.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.modified_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_cursor_orders_by_timestamp_first() {
        let early = Cursor::new(
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            uuid("ffffffff-ffff-ffff-ffff-ffffffffffff"),
        );
        let late = Cursor::new(
            Utc.with_ymd_and_hms(2021, 1, 2, 0, 0, 0).unwrap(),
            uuid("00000000-0000-0000-0000-000000000001"),
        );

        assert!(early < late);
    }

    #[test]
    fn test_cursor_breaks_ties_by_id() {
        let t = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        let smaller = Cursor::new(t, uuid("10000000-0000-0000-0000-000000000000"));
        let larger = Cursor::new(t, uuid("20000000-0000-0000-0000-000000000000"));

        assert!(smaller < larger);
        assert_eq!(smaller.max(larger), larger);
    }

    #[test]
    fn test_epoch_is_below_any_real_position() {
        let real = ChangedRecord::new(Uuid::new_v4(), Utc::now()).cursor();
        assert!(Cursor::epoch() < real);
    }

    #[test]
    fn test_entity_kind_names() {
        let names: Vec<&str> = EntityKind::ALL.iter().map(EntityKind::as_str).collect();
        assert_eq!(names, vec!["person", "genre", "movie"]);
        assert_eq!(EntityKind::Genre.to_string(), "genre");
    }
}

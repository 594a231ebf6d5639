//! Relational movie source trait definition.

use async_trait::async_trait;
use movies_indexer_shared::{ChangedRecord, Cursor, EntityKind};
use uuid::Uuid;

use crate::errors::SourceError;
use crate::types::MovieRow;

/// Read-only access to the relational store holding movies, persons and genres.
///
/// Every method is a pure read: calling it twice with the same arguments and
/// unchanged data returns the same result.
#[async_trait]
pub trait MovieSource: Send + Sync {
    /// Return up to `page_size` rows of `kind` positioned strictly after `cursor`.
    ///
    /// Rows satisfy `(modified_at, id) > (cursor.modified_at, cursor.id)` and
    /// are ordered ascending by `(modified_at, id)`.
    async fn scan_changed(
        &self,
        kind: EntityKind,
        cursor: Cursor,
        page_size: usize,
    ) -> Result<Vec<ChangedRecord>, SourceError>;

    /// Movies associated with any of the given persons.
    async fn movies_by_persons(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<ChangedRecord>, SourceError>;

    /// Movies associated with any of the given genres.
    async fn movies_by_genres(&self, genre_ids: &[Uuid])
        -> Result<Vec<ChangedRecord>, SourceError>;

    /// Full rows of the given movies with nested credits and genre names.
    ///
    /// Ids without a base row are absent from the result.
    async fn full_movie_rows(&self, movie_ids: &[Uuid]) -> Result<Vec<MovieRow>, SourceError>;
}

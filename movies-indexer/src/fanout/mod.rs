//! Fan-out from changed persons and genres to the movies that reference them.

use std::sync::Arc;

use movies_indexer_repository::MovieSource;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::SyncError;
use crate::retry::RetryPolicy;

/// Resolves dimension ids to affected movie ids through the association tables.
///
/// Results of the two lookups may overlap; callers deduplicate.
pub struct FanoutResolver {
    source: Arc<dyn MovieSource>,
    retry: RetryPolicy,
}

impl FanoutResolver {
    pub fn new(source: Arc<dyn MovieSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Movies credited to any of `person_ids`.
    #[instrument(skip_all, fields(person_count = person_ids.len()))]
    pub async fn affected_movies_by_person(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, SyncError> {
        if person_ids.is_empty() {
            return Ok(Vec::new());
        }

        let source = self.source.as_ref();
        let records = self
            .retry
            .run("movies_by_persons", move || source.movies_by_persons(person_ids))
            .await?;

        debug!(movie_count = records.len(), "Resolved movies by person");
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Movies tagged with any of `genre_ids`.
    #[instrument(skip_all, fields(genre_count = genre_ids.len()))]
    pub async fn affected_movies_by_genre(
        &self,
        genre_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, SyncError> {
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        let source = self.source.as_ref();
        let records = self
            .retry
            .run("movies_by_genres", move || source.movies_by_genres(genre_ids))
            .await?;

        debug!(movie_count = records.len(), "Resolved movies by genre");
        Ok(records.into_iter().map(|r| r.id).collect())
    }
}

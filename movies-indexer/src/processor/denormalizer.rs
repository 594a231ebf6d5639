//! Denormalizer implementation.
//!
//! Reads full movie rows in one batch and flattens each into a `MovieDocument`.

use std::sync::Arc;

use movies_indexer_repository::{MovieRow, MovieSource};
use movies_indexer_shared::{MovieDocument, PersonRef, PersonRole};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::SyncError;
use crate::retry::RetryPolicy;

/// Assembles movie documents from base rows, credits and genres.
pub struct Denormalizer {
    source: Arc<dyn MovieSource>,
    retry: RetryPolicy,
}

impl Denormalizer {
    pub fn new(source: Arc<dyn MovieSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Build documents for `movie_ids`.
    ///
    /// Ids without a base row (e.g. deleted movies) are omitted from the
    /// result. Empty input returns immediately without a query.
    ///
    /// # Arguments
    ///
    /// * `movie_ids` - Deduplicated movie primary keys
    #[instrument(skip_all, fields(movie_count = movie_ids.len()))]
    pub async fn denormalize(&self, movie_ids: &[Uuid]) -> Result<Vec<MovieDocument>, SyncError> {
        if movie_ids.is_empty() {
            return Ok(Vec::new());
        }

        let source = self.source.as_ref();
        let rows = self
            .retry
            .run("full_movie_rows", move || source.full_movie_rows(movie_ids))
            .await?;

        let documents: Vec<MovieDocument> = rows.into_iter().map(build_document).collect();

        if documents.len() < movie_ids.len() {
            debug!(
                requested = movie_ids.len(),
                found = documents.len(),
                "Some movies no longer exist and were skipped"
            );
        }

        Ok(documents)
    }
}

/// Flatten one movie row into its search document.
///
/// Credits are applied in row order: the last director wins, actors and
/// writers keep their order, and each role list is mirrored into its names
/// field.
pub fn build_document(row: MovieRow) -> MovieDocument {
    let mut doc = MovieDocument::new(row.id, row.title, row.kind, row.created_at, row.modified_at);
    doc.description = row.description;
    doc.rating = row.rating;
    doc.genres = row.genres;

    for credit in row.persons {
        match credit.role {
            PersonRole::Director => doc.director = Some(credit.name),
            PersonRole::Actor => {
                doc.actors_names.push(credit.name.clone());
                doc.actors.push(PersonRef::new(credit.id, credit.name));
            }
            PersonRole::Writer => {
                doc.writers_names.push(credit.name.clone());
                doc.writers.push(PersonRef::new(credit.id, credit.name));
            }
        }
    }

    doc
}

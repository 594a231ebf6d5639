//! Loader module for the movies indexer.
//!
//! Writes movie documents into the search index with bulk upserts.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::errors::SyncError;
use crate::retry::RetryPolicy;
use movies_indexer_repository::{BatchOperationSummary, SearchIndexProvider};
use movies_indexer_shared::MovieDocument;

/// Writer that upserts documents into the search index.
///
/// The writer is responsible for:
/// - Creating the index on first use
/// - Retrying transient connectivity failures
/// - Turning rejected bulk items into a failed write
/// - Counting writes in a row that the index rejected
pub struct IndexWriter {
    provider: Arc<dyn SearchIndexProvider>,
    retry: RetryPolicy,
    /// Bulk writes in a row that ended with rejected items.
    consecutive_rejections: AtomicU32,
}

impl IndexWriter {
    /// Create a new index writer with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            consecutive_rejections: AtomicU32::new(0),
        }
    }

    /// Number of bulk writes in a row that ended with rejected items.
    ///
    /// A rejected document is resent every cycle, so a count that keeps
    /// growing points at a document the index will never accept.
    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections.load(Ordering::Relaxed)
    }

    /// Create the index with its mapping if it does not exist yet.
    ///
    /// Makes a single attempt; retrying at startup is up to the caller's
    /// connection mode.
    #[instrument(skip(self))]
    pub async fn ensure_index(&self) -> Result<(), SyncError> {
        self.provider.ensure_index_exists().await?;
        Ok(())
    }

    /// Upsert `documents`, each keyed by its movie id.
    ///
    /// Empty input succeeds without contacting the index. If the index rejects
    /// any item the write fails with [`SyncError::PartialWrite`]; accepted items
    /// stay written and are overwritten again on the next attempt.
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    pub async fn bulk_upsert(
        &self,
        documents: &[MovieDocument],
    ) -> Result<BatchOperationSummary, SyncError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let provider = self.provider.as_ref();
        let summary = match self
            .retry
            .run("bulk_upsert", move || provider.bulk_upsert(documents))
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, count = documents.len(), "Failed to bulk upsert documents");
                return Err(e.into());
            }
        };

        if !summary.is_complete() {
            let rejections = self.consecutive_rejections.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                consecutive_rejections = rejections,
                "Bulk upsert completed with some failures"
            );
            for result in summary.results.iter().filter(|r| !r.success) {
                let reason = result
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown".to_string());
                error!(
                    document_id = %result.document_id,
                    error = %reason,
                    consecutive_rejections = rejections,
                    "Index rejected document, watermarks cannot advance until it is fixed at the source"
                );
            }
            return Err(SyncError::partial_write(summary.failed, summary.total));
        }

        self.consecutive_rejections.store(0, Ordering::Relaxed);

        debug!(count = summary.succeeded, "Successfully upserted all documents");
        Ok(summary)
    }
}

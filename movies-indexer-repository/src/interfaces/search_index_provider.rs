//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use movies_indexer_shared::MovieDocument;

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Index Initialization
///
/// `ensure_index_exists` should be called during application startup so the index and
/// its mapping exist before any document is written.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index exists, creating it with its mapping if necessary.
    ///
    /// Idempotent: an existing index is left untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index is ready for use
    /// * `Err(SearchIndexError)` - If initialization fails
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Insert or overwrite documents keyed by their id.
    ///
    /// Re-sending a document with the same id replaces the stored version.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents to write; an empty slice performs no request
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Per-document outcomes of the request
    /// * `Err(SearchIndexError)` - If the request as a whole failed
    async fn bulk_upsert(
        &self,
        documents: &[MovieDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}

//! Error types for the sync pipeline.

use movies_indexer_repository::{SearchIndexError, SourceError, WatermarkError};
use thiserror::Error;

/// Errors that abort a sync cycle.
///
/// None of these advance a watermark. Transient failures only reach this type
/// once the retry policy has given up.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Reading the relational store failed.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Writing to the search index failed.
    #[error("Index error: {0}")]
    IndexError(#[from] SearchIndexError),

    /// Reading or persisting watermarks failed.
    #[error("Watermark error: {0}")]
    WatermarkError(#[from] WatermarkError),

    /// The index accepted only part of a bulk write.
    #[error("Bulk write rejected {failed} of {total} documents")]
    PartialWrite { failed: usize, total: usize },
}

impl SyncError {
    /// Create a partial write error.
    pub fn partial_write(failed: usize, total: usize) -> Self {
        Self::PartialWrite { failed, total }
    }
}

//! # Movies Indexer
//!
//! Keeps an OpenSearch movies index in sync with a PostgreSQL catalogue by
//! polling for changed rows.
//!
//! ## Architecture
//!
//! Every cycle follows the same steps:
//!
//! 1. **Scanner**: Reads one page of changed persons, genres and movies
//! 2. **Fan-out**: Maps changed persons and genres to the movies they appear in
//! 3. **Processor**: Denormalizes the affected movies into documents
//! 4. **Loader**: Bulk upserts the documents into the index
//! 5. **Orchestrator**: Advances the watermarks once the write succeeded
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`scanner`]: Paginated change scans
//! - [`fanout`]: Dimension to movie resolution
//! - [`processor`]: Movie denormalization
//! - [`loader`]: Index writes
//! - [`watermarks`]: Cursor state owned by the orchestrator
//! - [`orchestrator`]: Coordinates the sync cycle
//! - [`retry`]: Backoff for transient failures
//! - [`errors`]: Error types for the indexer

pub mod config;
pub mod errors;
pub mod fanout;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod retry;
pub mod scanner;
pub mod watermarks;

pub use config::Dependencies;
pub use errors::SyncError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sync error.
    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

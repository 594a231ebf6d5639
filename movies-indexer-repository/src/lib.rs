//! # Movies Indexer Repository
//!
//! This crate provides traits and implementations for the storage seams of the
//! movies search sync: the relational movie source (PostgreSQL), the durable
//! watermark store (JSON file) and the search index (OpenSearch).

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod state;
pub mod types;

pub use errors::{SearchIndexError, SourceError, WatermarkError};
pub use interfaces::{MovieSource, SearchIndexProvider, WatermarkStore};
pub use opensearch::OpenSearchProvider;
pub use postgres::PostgresMovieSource;
pub use state::JsonFileWatermarkStore;
pub use types::{
    BatchOperationResult, BatchOperationSummary, MovieRow, PersonCredit, PersonCreditRow,
};

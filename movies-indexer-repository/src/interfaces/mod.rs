//! Interface definitions for the storage seams of the sync.
//!
//! These traits allow for dependency injection and swappable backends: the
//! orchestrator and its components only ever see the traits, and tests plug
//! in in-memory implementations.

mod movie_source;
mod search_index_provider;
mod watermark_store;

pub use movie_source::MovieSource;
pub use search_index_provider::SearchIndexProvider;
pub use watermark_store::WatermarkStore;

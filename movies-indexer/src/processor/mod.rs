//! Processor module for the movies indexer.
//!
//! Turns movie ids into self-contained search documents.

mod denormalizer;

pub use denormalizer::{build_document, Denormalizer};

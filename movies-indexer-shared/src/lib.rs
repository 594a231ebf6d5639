//! # Movies Indexer Shared
//!
//! This crate defines shared data structures and types used across the movies
//! search sync. It includes the change-tracking cursor types and the movie
//! document written to the search index.

pub mod types;

pub use types::cursor::{ChangedRecord, Cursor, EntityKind};
pub use types::movie_document::{MovieDocument, PersonRef, PersonRole, UnknownRoleError};

//! This module defines the core data structures and types used across the movies indexer.
//! It re-exports the cursor types and `MovieDocument`.

pub mod cursor;
pub mod movie_document;

pub use cursor::{ChangedRecord, Cursor, EntityKind};
pub use movie_document::{MovieDocument, PersonRef, PersonRole};

//! Movie document types for the search index.
//!
//! This module defines the denormalized document structure that is indexed in
//! the search engine, together with the person roles it is assembled from.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Role of a person in a movie, as stored on the person/movie association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    Director,
    Actor,
    Writer,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Director => "director",
            PersonRole::Actor => "actor",
            PersonRole::Writer => "writer",
        }
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is neither a known role name nor a legacy role code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown person role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for PersonRole {
    type Err = UnknownRoleError;

    /// Parse a role name. The legacy two-letter codes `DR`, `AC` and `PR` are
    /// accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "director" | "dr" => Ok(PersonRole::Director),
            "actor" | "ac" => Ok(PersonRole::Actor),
            "writer" | "pr" => Ok(PersonRole::Writer),
            _ => Err(UnknownRoleError(s.to_string())),
        }
    }
}

/// A person reference embedded in a movie document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

impl PersonRef {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Document representation of a movie in the search index.
///
/// The document is self-contained: genre names and the people involved are
/// flattened into it, so a search never needs a join. The document id in the
/// index is the movie's primary key, which makes re-indexing an overwrite.
///
/// # Fields
///
/// - `id`: Movie primary key, also used as the index document id
/// - `title`: Movie title (primary search field)
/// - `description`: Optional description text
/// - `rating`: Optional rating, serialized as `imdb_rating`
/// - `kind`: Movie type (e.g. `movie`, `tv_show`), serialized as `type`
/// - `genres`: Genre names; order carries no meaning
/// - `director`: Name of the director, if any
/// - `actors` / `writers`: People in those roles
/// - `actors_names` / `writers_names`: Flattened names for full-text search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDocument {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "imdb_rating")]
    pub rating: Option<f64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
}

impl MovieDocument {
    /// Create a document with no genres and no people attached.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use movies_indexer_shared::MovieDocument;
    /// use uuid::Uuid;
    ///
    /// let now = Utc::now();
    /// let doc = MovieDocument::new(Uuid::new_v4(), "Star Slammer", "movie", now, now);
    /// assert!(doc.actors.is_empty());
    /// assert!(doc.director.is_none());
    /// ```
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        kind: impl Into<String>,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            rating: None,
            kind: kind.into(),
            created_at,
            modified_at,
            genres: Vec::new(),
            director: None,
            actors: Vec::new(),
            writers: Vec::new(),
            actors_names: Vec::new(),
            writers_names: Vec::new(),
        }
    }

    /// The id under which this document is stored in the search index.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}

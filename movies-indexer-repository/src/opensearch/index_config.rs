//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the movies index.

use serde_json::{json, Value};

use crate::errors::SearchIndexError;

/// The default name of the movies index.
pub const INDEX_NAME: &str = "movies";

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The index name used for all operations.
    pub name: String,
    /// Index creation body with `settings` and `mappings`.
    pub body: Value,
}

impl IndexConfig {
    /// Create a configuration using the built-in movies mapping.
    ///
    /// # Arguments
    ///
    /// * `name` - The index name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: get_index_settings(),
        }
    }

    /// Create a configuration with a caller-provided schema.
    ///
    /// The schema must be a JSON object carrying both `settings` and `mappings`.
    ///
    /// # Returns
    ///
    /// * `Ok(IndexConfig)` - If the schema has the expected shape
    /// * `Err(SearchIndexError::ValidationError)` - Otherwise
    pub fn with_schema(name: impl Into<String>, schema: Value) -> Result<Self, SearchIndexError> {
        for key in ["settings", "mappings"] {
            if !schema.get(key).is_some_and(Value::is_object) {
                return Err(SearchIndexError::validation(format!(
                    "Index schema must contain a '{}' object",
                    key
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            body: json!({
                "settings": schema["settings"],
                "mappings": schema["mappings"],
            }),
        })
    }
}

/// Get the index settings and mappings for the movies index.
///
/// The configuration includes:
/// - **English analyzer** with stop words and stemming for titles and people
/// - **Keyword fields**: ids, genres and movie type for filtering
/// - **Nested people**: actors and writers keep id and name together
/// - **Flattened names**: `actors_names` / `writers_names` for full-text matches
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "refresh_interval": "1s",
            "number_of_shards": 1,
            "number_of_replicas": 1,
            "analysis": {
                "filter": {
                    "english_stop": {
                        "type": "stop",
                        "stopwords": "_english_"
                    },
                    "english_stemmer": {
                        "type": "stemmer",
                        "language": "english"
                    },
                    "english_possessive_stemmer": {
                        "type": "stemmer",
                        "language": "possessive_english"
                    }
                },
                "analyzer": {
                    "movies_analyzer": {
                        "tokenizer": "standard",
                        "filter": [
                            "lowercase",
                            "english_stop",
                            "english_stemmer",
                            "english_possessive_stemmer"
                        ]
                    }
                }
            }
        },
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "imdb_rating": {
                    "type": "float"
                },
                "type": {
                    "type": "keyword"
                },
                "genres": {
                    "type": "keyword"
                },
                "title": {
                    "type": "text",
                    "analyzer": "movies_analyzer",
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "description": {
                    "type": "text",
                    "analyzer": "movies_analyzer"
                },
                "director": {
                    "type": "text",
                    "analyzer": "movies_analyzer"
                },
                "actors_names": {
                    "type": "text",
                    "analyzer": "movies_analyzer"
                },
                "writers_names": {
                    "type": "text",
                    "analyzer": "movies_analyzer"
                },
                "actors": person_mapping(),
                "writers": person_mapping(),
                "created_at": {
                    "type": "date"
                },
                "modified_at": {
                    "type": "date"
                }
            }
        }
    })
}

fn person_mapping() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": {
                "type": "keyword"
            },
            "name": {
                "type": "text",
                "analyzer": "movies_analyzer"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["settings"]["analysis"]["analyzer"]["movies_analyzer"].is_object());

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["id"]["type"], "keyword");
        assert_eq!(properties["genres"]["type"], "keyword");
        assert_eq!(properties["title"]["fields"]["raw"]["type"], "keyword");
        assert_eq!(properties["actors"]["type"], "nested");
        assert_eq!(properties["writers"]["properties"]["name"]["type"], "text");
    }

    #[test]
    fn test_mapping_covers_document_fields() {
        let settings = get_index_settings();
        let properties = settings["mappings"]["properties"].as_object().unwrap();

        for field in [
            "id",
            "title",
            "description",
            "imdb_rating",
            "type",
            "created_at",
            "modified_at",
            "genres",
            "director",
            "actors",
            "writers",
            "actors_names",
            "writers_names",
        ] {
            assert!(properties.contains_key(field), "missing mapping for {}", field);
        }
    }

    #[test]
    fn test_default_config_uses_builtin_mapping() {
        let config = IndexConfig::new(INDEX_NAME);
        assert_eq!(config.name, "movies");
        assert_eq!(config.body, get_index_settings());
    }

    #[test]
    fn test_with_schema_requires_settings_and_mappings() {
        let missing = IndexConfig::with_schema("movies", json!({ "mappings": {} }));
        assert!(matches!(missing, Err(SearchIndexError::ValidationError(_))));

        let valid = IndexConfig::with_schema(
            "movies",
            json!({ "settings": {}, "mappings": { "properties": {} }, "aliases": {} }),
        )
        .unwrap();
        assert!(valid.body.get("aliases").is_none());
        assert!(valid.body["mappings"]["properties"].is_object());
    }
}

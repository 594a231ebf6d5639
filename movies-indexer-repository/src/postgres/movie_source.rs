//! PostgreSQL-backed movie source.
//!
//! Reads changed rows, fan-out lookups and full movie rows from the `content`
//! schema (or another configured schema) and converts them into typed records.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movies_indexer_shared::{ChangedRecord, Cursor, EntityKind};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::queries::Queries;
use crate::errors::SourceError;
use crate::interfaces::MovieSource;
use crate::types::{MovieRow, PersonCredit, PersonCreditRow};

/// Default number of pooled connections.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a query waits for a pooled connection before giving up.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL-backed movie source.
pub struct PostgresMovieSource {
    pool: PgPool,
    queries: Queries,
}

impl PostgresMovieSource {
    /// Create a source for the database at `url` reading from `schema`.
    ///
    /// No connection is opened here. Connections are established on first
    /// use, so an unreachable database surfaces as a transient error from the
    /// first query instead of failing construction.
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresMovieSource)` - Source with a lazy pool
    /// * `Err(SourceError)` - If the schema name or the URL is invalid
    pub fn connect_lazy(url: &str, schema: &str) -> Result<Self, SourceError> {
        Self::validate_schema(schema)?;
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS))
            .connect_lazy(url)?;
        Self::new(pool, schema)
    }

    /// Create a source over an existing pool.
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    /// * `schema` - Schema holding the movie tables
    pub fn new(pool: PgPool, schema: &str) -> Result<Self, SourceError> {
        Self::validate_schema(schema)?;
        Ok(Self {
            pool,
            queries: Queries::new(schema),
        })
    }

    /// Schema names are interpolated into statements, so only plain
    /// identifiers are accepted.
    fn validate_schema(schema: &str) -> Result<(), SourceError> {
        if schema.is_empty() {
            return Err(SourceError::configuration("Schema name cannot be empty"));
        }

        let starts_ok = schema
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !starts_ok || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SourceError::configuration(format!(
                "Schema name '{}' contains invalid characters. Only alphanumeric characters and underscores are allowed",
                schema
            )));
        }

        Ok(())
    }

    fn changed_record(row: &PgRow) -> Result<ChangedRecord, SourceError> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| SourceError::integrity(format!("invalid id: {}", e)))?;
        let modified_at: DateTime<Utc> = row
            .try_get("modified_at")
            .map_err(|e| SourceError::integrity(format!("row {} has invalid modified_at: {}", id, e)))?;
        Ok(ChangedRecord::new(id, modified_at))
    }

    fn movie_row(row: &PgRow) -> Result<MovieRow, SourceError> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| SourceError::integrity(format!("invalid movie id: {}", e)))?;
        let field = |e: sqlx::Error| SourceError::integrity(format!("movie {}: {}", id, e));

        let persons: serde_json::Value = row.try_get("persons").map_err(field)?;
        let persons: Vec<PersonCreditRow> = serde_json::from_value(persons)
            .map_err(|e| SourceError::integrity(format!("movie {} has malformed persons: {}", id, e)))?;
        let persons = persons
            .into_iter()
            .map(PersonCredit::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MovieRow {
            id,
            title: row.try_get("title").map_err(field)?,
            description: row.try_get("description").map_err(field)?,
            rating: row.try_get("rating").map_err(field)?,
            kind: row.try_get("type").map_err(field)?,
            created_at: row.try_get("created_at").map_err(field)?,
            modified_at: row.try_get("modified_at").map_err(field)?,
            persons,
            genres: row.try_get("genres").map_err(field)?,
        })
    }

    async fn fetch_changed(&self, sql: &str, ids: &[Uuid]) -> Result<Vec<ChangedRecord>, SourceError> {
        let rows = sqlx::query(sql).bind(ids).fetch_all(&self.pool).await?;
        rows.iter().map(Self::changed_record).collect()
    }
}

#[async_trait]
impl MovieSource for PostgresMovieSource {
    #[instrument(skip(self), fields(kind = %kind, cursor = %cursor))]
    async fn scan_changed(
        &self,
        kind: EntityKind,
        cursor: Cursor,
        page_size: usize,
    ) -> Result<Vec<ChangedRecord>, SourceError> {
        let limit = i64::try_from(page_size)
            .map_err(|_| SourceError::configuration(format!("page size {} is too large", page_size)))?;

        let rows = sqlx::query(self.queries.scan(kind))
            .bind(cursor.modified_at)
            .bind(cursor.id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(Self::changed_record)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = records.len(), "Scanned changed rows");
        Ok(records)
    }

    async fn movies_by_persons(
        &self,
        person_ids: &[Uuid],
    ) -> Result<Vec<ChangedRecord>, SourceError> {
        self.fetch_changed(&self.queries.movies_by_persons, person_ids)
            .await
    }

    async fn movies_by_genres(
        &self,
        genre_ids: &[Uuid],
    ) -> Result<Vec<ChangedRecord>, SourceError> {
        self.fetch_changed(&self.queries.movies_by_genres, genre_ids)
            .await
    }

    async fn full_movie_rows(&self, movie_ids: &[Uuid]) -> Result<Vec<MovieRow>, SourceError> {
        let rows = sqlx::query(&self.queries.full_movie_rows)
            .bind(movie_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::movie_row).collect()
    }
}

//! Typed records and bulk operation results.
//!
//! Rows read from the relational store are converted into these records at
//! the store boundary; malformed input is rejected there rather than coerced.

use chrono::{DateTime, Utc};
use movies_indexer_shared::PersonRole;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{SearchIndexError, SourceError};

/// A person credit as aggregated by the movie query (raw JSON shape).
#[derive(Debug, Clone, Deserialize)]
pub struct PersonCreditRow {
    pub id: Uuid,
    pub full_name: String,
    pub role: String,
}

/// A validated person credit on a movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonCredit {
    pub id: Uuid,
    pub name: String,
    pub role: PersonRole,
}

impl TryFrom<PersonCreditRow> for PersonCredit {
    type Error = SourceError;

    fn try_from(row: PersonCreditRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<PersonRole>().map_err(|e| {
            SourceError::integrity(format!("person {} has invalid role: {}", row.id, e))
        })?;

        Ok(Self {
            id: row.id,
            name: row.full_name,
            role,
        })
    }
}

/// A movie base row together with its credits and genre names.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Credits in the order the store returned them.
    pub persons: Vec<PersonCredit>,
    pub genres: Vec<String>,
}

/// Result of a batch operation for a single document.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The index document id.
    pub document_id: String,
    /// Whether the backend acknowledged the write.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Callers use the per-document results to decide whether a batch was fully
/// written; a response-level success is not enough.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-document results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Whether every document in the batch was acknowledged.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Ids of the documents the backend rejected.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.document_id.as_str())
            .collect()
    }
}

//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use movies_indexer_shared::MovieDocument;
use opensearch::{
    http::{
        request::JsonBody,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::IndexConfig;
use crate::types::{BatchOperationResult, BatchOperationSummary};

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use movies_indexer_repository::opensearch::{IndexConfig, OpenSearchProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::new("movies")).await?;
/// provider.ensure_index_exists().await?;
/// let summary = provider.bulk_upsert(&documents).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index name and creation body
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::validation(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Classify a transport-level failure.
    ///
    /// Errors without an HTTP status never reached the server and are treated
    /// as connectivity problems.
    fn transport_error(err: opensearch::Error) -> SearchIndexError {
        if err.is_timeout() || err.status_code().is_none() {
            SearchIndexError::connection(err.to_string())
        } else {
            SearchIndexError::index(err.to_string())
        }
    }

    /// Statuses that signal a temporarily unavailable cluster.
    fn is_unavailable(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 502 | 503 | 504)
    }

    /// Build the NDJSON body of a bulk request: one `index` action per document.
    fn bulk_body(documents: &[MovieDocument]) -> Result<Vec<JsonBody<Value>>, SearchIndexError> {
        let mut body = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            body.push(JsonBody::new(json!({
                "index": { "_id": document.document_id() }
            })));
            let source = serde_json::to_value(document)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(JsonBody::new(source));
        }
        Ok(body)
    }

    /// Turn a bulk response body into per-document outcomes.
    ///
    /// Items are matched to documents by position; the response lists them in
    /// request order.
    fn summarize_bulk_response(
        documents: &[MovieDocument],
        response: &Value,
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let items = response["items"]
            .as_array()
            .ok_or_else(|| SearchIndexError::parse("Bulk response has no 'items' array"))?;

        if items.len() != documents.len() {
            return Err(SearchIndexError::parse(format!(
                "Bulk response has {} items for {} documents",
                items.len(),
                documents.len()
            )));
        }

        let results = documents
            .iter()
            .zip(items)
            .map(|(document, item)| {
                let outcome = &item["index"];
                let status = outcome["status"].as_u64().unwrap_or(0);
                let failed = !outcome["error"].is_null() || !(200..300).contains(&status);

                BatchOperationResult {
                    document_id: document.document_id(),
                    success: !failed,
                    error: failed.then(|| {
                        SearchIndexError::bulk_index(format!(
                            "status {}: {}",
                            status, outcome["error"]
                        ))
                    }),
                }
            })
            .collect();

        Ok(BatchOperationSummary::from_results(results))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the index with its mapping unless it already exists.
    ///
    /// A concurrent creation that wins the race is reported by the server as
    /// `resource_already_exists_exception` and treated as success.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let name = self.index_config.name.as_str();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status_code();
        if status.is_success() {
            debug!(index = %name, "Index already exists");
            return Ok(());
        }
        if Self::is_unavailable(status) {
            return Err(SearchIndexError::connection(format!(
                "Index existence check returned status {}",
                status
            )));
        }
        if status != StatusCode::NOT_FOUND {
            return Err(SearchIndexError::index_creation(format!(
                "Index existence check failed with status {}",
                status
            )));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(self.index_config.body.clone())
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %name, "Index created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            if Self::is_unavailable(status) {
                return Err(SearchIndexError::connection(format!(
                    "Index creation returned status {}",
                    status
                )));
            }
            return Err(SearchIndexError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %name, "Search index created");
        Ok(())
    }

    /// Write documents with a single bulk request of `index` actions.
    ///
    /// `index` replaces any stored document with the same id, so repeating the
    /// request leaves exactly one copy of each document.
    async fn bulk_upsert(
        &self,
        documents: &[MovieDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let body = Self::bulk_body(documents)?;

        let response = self
            .client
            .bulk(BulkParts::Index(self.index_config.name.as_str()))
            .body(body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            let message = format!("Bulk request failed with status {}: {}", status, error_body);
            return Err(if Self::is_unavailable(status) {
                SearchIndexError::connection(message)
            } else {
                SearchIndexError::index(message)
            });
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;

        let summary = Self::summarize_bulk_response(documents, &response_body)?;
        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk upsert completed"
        );
        Ok(summary)
    }
}

//! Dependency initialization and wiring for the movies indexer.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use super::settings::{ConnectionMode, SyncSettings};
use crate::fanout::FanoutResolver;
use crate::loader::IndexWriter;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::Denormalizer;
use crate::scanner::ChangeScanner;
use crate::watermarks::Watermarks;
use crate::IndexingError;
use movies_indexer_repository::{
    JsonFileWatermarkStore, MovieSource, OpenSearchProvider, PostgresMovieSource,
    SearchIndexProvider,
};

/// Connection retry interval at startup in seconds.
const STARTUP_RETRY_INTERVAL_SECS: u64 = 15;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`SyncSettings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If configuration is invalid or, in fail-fast
    ///   mode, the index cannot be reached. PostgreSQL is not contacted here;
    ///   its outages are retried by the sync cycle.
    pub async fn new() -> Result<Self, IndexingError> {
        let settings = SyncSettings::from_env()?;
        Self::from_settings(settings).await
    }

    /// Initialize all dependencies from already loaded settings.
    pub async fn from_settings(settings: SyncSettings) -> Result<Self, IndexingError> {
        info!(
            db_schema = %settings.db_schema,
            opensearch_url = %settings.opensearch_url,
            index = %settings.index_config.name,
            state_file = %settings.state_file_path.display(),
            page_size = settings.page_size,
            poll_interval_secs = settings.poll_interval.as_secs(),
            connection_mode = ?settings.connection_mode,
            "Initializing dependencies"
        );

        let source: Arc<dyn MovieSource> = Arc::new(
            PostgresMovieSource::connect_lazy(&settings.database_url, &settings.db_schema)
                .map_err(|e| IndexingError::config(format!("Failed to configure PostgreSQL: {}", e)))?,
        );

        info!("PostgreSQL pool configured, connections open on first query");

        let search_provider: Arc<dyn SearchIndexProvider> = Arc::new(
            OpenSearchProvider::new(&settings.opensearch_url, settings.index_config.clone())
                .await
                .map_err(|e| {
                    IndexingError::config(format!("Failed to create OpenSearch provider: {}", e))
                })?,
        );

        let retry = settings.retry.clone();
        let writer = IndexWriter::new(search_provider, retry.clone());
        Self::prepare_index(
            &writer,
            &settings.opensearch_url,
            settings.connection_mode,
            Duration::from_secs(STARTUP_RETRY_INTERVAL_SECS),
        )
        .await?;

        info!("OpenSearch connection established");

        let store = Arc::new(JsonFileWatermarkStore::new(&settings.state_file_path));
        let watermarks = Watermarks::load(store)
            .await
            .map_err(|e| IndexingError::config(format!("Failed to load watermarks: {}", e)))?;

        let orchestrator = Orchestrator::with_config(
            ChangeScanner::new(source.clone(), settings.page_size, retry.clone()),
            FanoutResolver::new(source.clone(), retry.clone()),
            Denormalizer::new(source, retry),
            writer,
            watermarks,
            OrchestratorConfig {
                poll_interval: settings.poll_interval,
            },
        );

        Ok(Self { orchestrator })
    }

    /// Ensure the index exists, retrying based on connection mode.
    ///
    /// This is the only place the index is created; the sync loop assumes it
    /// is in place.
    async fn prepare_index(
        writer: &IndexWriter,
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<(), IndexingError> {
        loop {
            match writer.ensure_index().await {
                Ok(()) => return Ok(()),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to ensure index exists: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to reach OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}

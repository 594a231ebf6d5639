//! Orchestrator module for the movies indexer.
//!
//! Drives the sync cycle: scan changes, fan out to movies, denormalize, write,
//! and only then advance the watermarks.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use movies_indexer_shared::{Cursor, EntityKind};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::errors::SyncError;
use crate::fanout::FanoutResolver;
use crate::loader::IndexWriter;
use crate::processor::Denormalizer;
use crate::scanner::{ChangePage, ChangeScanner};
use crate::watermarks::Watermarks;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sleep between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Step of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ScanningPersons,
    ScanningGenres,
    ScanningMovies,
    ResolvingFanout,
    Denormalizing,
    Writing,
    AdvancingWatermarks,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub persons_changed: usize,
    pub genres_changed: usize,
    pub movies_changed: usize,
    /// Distinct movie ids after fan-out and deduplication.
    pub movies_affected: usize,
    pub documents_indexed: usize,
    /// Kinds whose watermark moved.
    pub advanced: Vec<EntityKind>,
}

impl CycleReport {
    /// Whether the cycle found nothing to do.
    pub fn is_idle(&self) -> bool {
        self.persons_changed == 0 && self.genres_changed == 0 && self.movies_changed == 0
    }
}

/// Orchestrator that runs sync cycles one at a time.
///
/// Each step runs only after the previous one succeeded. A failed step ends
/// the cycle with every watermark untouched, so the next cycle repeats the
/// same work.
pub struct Orchestrator {
    scanner: ChangeScanner,
    fanout: FanoutResolver,
    denormalizer: Denormalizer,
    writer: IndexWriter,
    watermarks: Watermarks,
    config: OrchestratorConfig,
    state: SyncState,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of cycles completed since startup.
    total_cycles: u64,
    /// Total number of documents indexed since startup.
    total_documents_indexed: u64,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        scanner: ChangeScanner,
        fanout: FanoutResolver,
        denormalizer: Denormalizer,
        writer: IndexWriter,
        watermarks: Watermarks,
    ) -> Self {
        Self::with_config(
            scanner,
            fanout,
            denormalizer,
            writer,
            watermarks,
            OrchestratorConfig::default(),
        )
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        scanner: ChangeScanner,
        fanout: FanoutResolver,
        denormalizer: Denormalizer,
        writer: IndexWriter,
        watermarks: Watermarks,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            scanner,
            fanout,
            denormalizer,
            writer,
            watermarks,
            config,
            state: SyncState::Idle,
            shutdown_tx,
            total_cycles: 0,
            total_documents_indexed: 0,
        }
    }

    /// Current step.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Current watermark of `kind`.
    pub fn watermark(&self, kind: EntityKind) -> Cursor {
        self.watermarks.get(kind)
    }

    /// Sender that stops [`Orchestrator::run`], also in the middle of a cycle.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run cycles until a shutdown signal is received.
    ///
    /// A failed cycle is logged and retried after the poll interval. Watermark
    /// persistence failures are fatal and end the loop with an error.
    ///
    /// Ctrl-C or the shutdown handle interrupt a running cycle at its next
    /// await point, including while it waits out a retry. Watermarks only move
    /// in the last step of a cycle, so an interrupted cycle leaves them as they
    /// were.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), SyncError> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            page_size = self.scanner.page_size(),
            "Starting movies sync orchestrator"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            let outcome = tokio::select! {
                result = self.run_cycle() => Some(result),
                _ = &mut ctrl_c => {
                    info!("Received shutdown signal during sync cycle");
                    None
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested during sync cycle");
                    None
                }
            };

            let Some(result) = outcome else {
                self.transition(SyncState::Idle);
                break;
            };

            match result {
                Ok(report) if report.is_idle() => {
                    debug!("No changes found");
                }
                Ok(report) => {
                    info!(
                        persons_changed = report.persons_changed,
                        genres_changed = report.genres_changed,
                        movies_changed = report.movies_changed,
                        movies_affected = report.movies_affected,
                        documents_indexed = report.documents_indexed,
                        advanced = ?report.advanced,
                        "Sync cycle completed"
                    );
                }
                Err(e @ SyncError::WatermarkError(_)) => {
                    error!(error = %e, "Failed to persist watermarks, stopping");
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, "Sync cycle failed, watermarks unchanged");
                }
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                _ = &mut ctrl_c => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        info!(
            total_cycles = self.total_cycles,
            total_documents_indexed = self.total_documents_indexed,
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Run a single sync cycle.
    ///
    /// The state returns to [`SyncState::Idle`] whether the cycle succeeded
    /// or not.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, SyncError> {
        let result = self.execute_cycle().await;
        self.transition(SyncState::Idle);

        if let Ok(ref report) = result {
            self.total_cycles += 1;
            self.total_documents_indexed += report.documents_indexed as u64;
        }
        result
    }

    async fn execute_cycle(&mut self) -> Result<CycleReport, SyncError> {
        self.transition(SyncState::ScanningPersons);
        let persons = self.scan(EntityKind::Person).await?;

        self.transition(SyncState::ScanningGenres);
        let genres = self.scan(EntityKind::Genre).await?;

        self.transition(SyncState::ScanningMovies);
        let movies = self.scan(EntityKind::Movie).await?;

        self.transition(SyncState::ResolvingFanout);
        let movie_ids = self.resolve_movie_ids(&persons, &genres, &movies).await?;

        self.transition(SyncState::Denormalizing);
        let documents = self.denormalizer.denormalize(&movie_ids).await?;

        self.transition(SyncState::Writing);
        let summary = self.writer.bulk_upsert(&documents).await?;

        self.transition(SyncState::AdvancingWatermarks);
        let observed: Vec<(EntityKind, Cursor)> = [&persons, &genres, &movies]
            .into_iter()
            .filter_map(|page| page.next_cursor.map(|cursor| (page.kind, cursor)))
            .collect();
        let advanced = self.watermarks.advance(&observed).await?;

        Ok(CycleReport {
            persons_changed: persons.len(),
            genres_changed: genres.len(),
            movies_changed: movies.len(),
            movies_affected: movie_ids.len(),
            documents_indexed: summary.succeeded,
            advanced,
        })
    }

    async fn scan(&self, kind: EntityKind) -> Result<ChangePage, SyncError> {
        self.scanner.scan(kind, self.watermarks.get(kind)).await
    }

    /// Union of fanned-out and directly changed movie ids, each id once.
    async fn resolve_movie_ids(
        &self,
        persons: &ChangePage,
        genres: &ChangePage,
        movies: &ChangePage,
    ) -> Result<Vec<Uuid>, SyncError> {
        let mut movie_ids = BTreeSet::new();
        movie_ids.extend(
            self.fanout
                .affected_movies_by_person(&persons.ids())
                .await?,
        );
        movie_ids.extend(self.fanout.affected_movies_by_genre(&genres.ids()).await?);
        movie_ids.extend(movies.ids());

        Ok(movie_ids.into_iter().collect())
    }

    fn transition(&mut self, next: SyncState) {
        debug!(from = %self.state, to = %next, "Sync state transition");
        self.state = next;
    }
}

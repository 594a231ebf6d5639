//! Change scanner: paginated reads of rows changed after a cursor.
//!
//! Each call returns one explicit page together with the cursor of its last
//! record. The scanner never assumes a short page means the backlog is
//! exhausted; the next cycle simply scans again from the returned cursor.

use std::sync::Arc;

use movies_indexer_repository::MovieSource;
use movies_indexer_shared::{ChangedRecord, Cursor, EntityKind};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::SyncError;
use crate::retry::RetryPolicy;

/// One page of changed rows for a single entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePage {
    pub kind: EntityKind,
    /// Records ordered ascending by `(modified_at, id)`.
    pub records: Vec<ChangedRecord>,
    /// Position of the last record, or `None` for an empty page.
    pub next_cursor: Option<Cursor>,
}

impl ChangePage {
    fn new(kind: EntityKind, records: Vec<ChangedRecord>) -> Self {
        let next_cursor = records.iter().map(ChangedRecord::cursor).max();
        Self {
            kind,
            records,
            next_cursor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Ids of the records on this page.
    pub fn ids(&self) -> Vec<Uuid> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Scans one page of changes per call.
pub struct ChangeScanner {
    source: Arc<dyn MovieSource>,
    page_size: usize,
    retry: RetryPolicy,
}

impl ChangeScanner {
    /// Create a scanner reading pages of at most `page_size` rows.
    pub fn new(source: Arc<dyn MovieSource>, page_size: usize, retry: RetryPolicy) -> Self {
        Self {
            source,
            page_size,
            retry,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Read the page of `kind` rows positioned strictly after `cursor`.
    ///
    /// Rows the store returns at or before the cursor are dropped, so the page
    /// never moves a watermark backwards.
    #[instrument(skip(self), fields(kind = %kind, cursor = %cursor))]
    pub async fn scan(&self, kind: EntityKind, cursor: Cursor) -> Result<ChangePage, SyncError> {
        let source = self.source.as_ref();
        let page_size = self.page_size;

        let mut records = self
            .retry
            .run("scan_changed", move || {
                source.scan_changed(kind, cursor, page_size)
            })
            .await?;

        records.retain(|r| r.cursor() > cursor);
        records.sort_by_key(ChangedRecord::cursor);
        records.dedup_by_key(|r| r.id);
        records.truncate(page_size);

        let page = ChangePage::new(kind, records);
        debug!(count = page.len(), next_cursor = ?page.next_cursor, "Scanned page");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use movies_indexer_repository::{MovieRow, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    /// Returns a fixed set of rows, honoring cursor and limit.
    struct FixedSource {
        rows: Vec<ChangedRecord>,
        calls: AtomicUsize,
        transient_failures: usize,
    }

    impl FixedSource {
        fn new(rows: Vec<ChangedRecord>) -> Self {
            Self {
                rows,
                calls: AtomicUsize::new(0),
                transient_failures: 0,
            }
        }
    }

    #[async_trait]
    impl MovieSource for FixedSource {
        async fn scan_changed(
            &self,
            _kind: EntityKind,
            cursor: Cursor,
            page_size: usize,
        ) -> Result<Vec<ChangedRecord>, SourceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.transient_failures {
                return Err(SourceError::DatabaseError(sqlx::Error::PoolTimedOut));
            }
            let mut rows: Vec<ChangedRecord> = self
                .rows
                .iter()
                .copied()
                .filter(|r| r.cursor() > cursor)
                .collect();
            rows.sort_by_key(ChangedRecord::cursor);
            rows.truncate(page_size);
            Ok(rows)
        }

        async fn movies_by_persons(&self, _: &[Uuid]) -> Result<Vec<ChangedRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn movies_by_genres(&self, _: &[Uuid]) -> Result<Vec<ChangedRecord>, SourceError> {
            Ok(Vec::new())
        }

        async fn full_movie_rows(&self, _: &[Uuid]) -> Result<Vec<MovieRow>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn no_wait_retry() -> RetryPolicy {
        RetryPolicy {
            jitter: false,
            initial_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(1),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_every_record_is_after_cursor() {
        let rows = (0..5)
            .map(|i| ChangedRecord::new(Uuid::from_u128(i + 1), ts(i as i64)))
            .collect();
        let scanner = ChangeScanner::new(Arc::new(FixedSource::new(rows)), 10, no_wait_retry());
        let cursor = Cursor::new(ts(2), Uuid::from_u128(3));

        let page = scanner.scan(EntityKind::Person, cursor).await.unwrap();

        assert_eq!(page.len(), 2);
        assert!(page.records.iter().all(|r| r.cursor() > cursor));
        assert_eq!(page.next_cursor, Some(Cursor::new(ts(4), Uuid::from_u128(5))));
    }

    #[tokio::test]
    async fn test_repeated_scan_returns_same_page() {
        let rows = vec![
            ChangedRecord::new(Uuid::from_u128(2), ts(1)),
            ChangedRecord::new(Uuid::from_u128(1), ts(1)),
            ChangedRecord::new(Uuid::from_u128(3), ts(2)),
        ];
        let scanner = ChangeScanner::new(Arc::new(FixedSource::new(rows)), 2, no_wait_retry());

        let first = scanner.scan(EntityKind::Genre, Cursor::epoch()).await.unwrap();
        let second = scanner.scan(EntityKind::Genre, Cursor::epoch()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.ids(), vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[tokio::test]
    async fn test_empty_page_has_no_cursor() {
        let scanner = ChangeScanner::new(Arc::new(FixedSource::new(Vec::new())), 10, no_wait_retry());

        let page = scanner.scan(EntityKind::Movie, Cursor::epoch()).await.unwrap();

        assert!(page.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let mut source = FixedSource::new(vec![ChangedRecord::new(Uuid::from_u128(1), ts(1))]);
        source.transient_failures = 2;
        let source = Arc::new(source);
        let scanner = ChangeScanner::new(source.clone(), 10, no_wait_retry());

        let page = scanner.scan(EntityKind::Movie, Cursor::epoch()).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}

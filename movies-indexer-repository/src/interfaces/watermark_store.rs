//! Watermark store trait definition.

use async_trait::async_trait;
use movies_indexer_shared::{Cursor, EntityKind};

use crate::errors::WatermarkError;

/// Durable per-entity-type cursor persistence.
///
/// Implementations must survive process restarts. Failures are never
/// defaulted away: callers abort the cycle on any error.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the persisted cursor for `kind`, or `None` if none was ever stored.
    async fn get(&self, kind: EntityKind) -> Result<Option<Cursor>, WatermarkError>;

    /// Persist the cursor for `kind`.
    async fn set(&self, kind: EntityKind, cursor: Cursor) -> Result<(), WatermarkError>;

    /// Persist several cursors.
    ///
    /// The default writes them one by one; implementations that can write
    /// them as a single record should override this.
    async fn set_many(&self, cursors: &[(EntityKind, Cursor)]) -> Result<(), WatermarkError> {
        for (kind, cursor) in cursors {
            self.set(*kind, *cursor).await?;
        }
        Ok(())
    }
}

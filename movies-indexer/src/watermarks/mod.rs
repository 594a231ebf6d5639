//! In-memory watermark state owned by the orchestrator.
//!
//! Loaded once at startup from the durable store, seeded where a cursor has
//! never been persisted, and written back only after a successful cycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use movies_indexer_repository::WatermarkStore;
use movies_indexer_shared::{Cursor, EntityKind};
use tracing::{debug, info, instrument};

use crate::errors::SyncError;

/// The current cursor of every tracked entity type.
pub struct Watermarks {
    store: Arc<dyn WatermarkStore>,
    cursors: BTreeMap<EntityKind, Cursor>,
}

impl Watermarks {
    /// Load all cursors, seeding missing ones with [`Cursor::epoch`].
    ///
    /// Seeded cursors are persisted right away so later runs read them back.
    #[instrument(skip(store))]
    pub async fn load(store: Arc<dyn WatermarkStore>) -> Result<Self, SyncError> {
        let mut cursors = BTreeMap::new();
        let mut seeded = Vec::new();

        for kind in EntityKind::ALL {
            let cursor = match store.get(kind).await? {
                Some(cursor) => cursor,
                None => {
                    seeded.push((kind, Cursor::epoch()));
                    Cursor::epoch()
                }
            };
            cursors.insert(kind, cursor);
        }

        if !seeded.is_empty() {
            store.set_many(&seeded).await?;
            info!(seeded = seeded.len(), "Seeded missing watermarks");
        }

        for (kind, cursor) in &cursors {
            debug!(kind = %kind, cursor = %cursor, "Loaded watermark");
        }

        Ok(Self { store, cursors })
    }

    /// Current cursor of `kind`.
    pub fn get(&self, kind: EntityKind) -> Cursor {
        self.cursors.get(&kind).copied().unwrap_or_else(Cursor::epoch)
    }

    /// Persist and apply the advanced cursors.
    ///
    /// Cursors that would not move a watermark forward are ignored. Nothing is
    /// written when no cursor moves. The in-memory state only changes once the
    /// store write succeeded.
    ///
    /// # Returns
    ///
    /// The kinds whose watermark moved.
    pub async fn advance(
        &mut self,
        observed: &[(EntityKind, Cursor)],
    ) -> Result<Vec<EntityKind>, SyncError> {
        let updates: Vec<(EntityKind, Cursor)> = observed
            .iter()
            .copied()
            .filter(|(kind, cursor)| *cursor > self.get(*kind))
            .collect();

        if updates.is_empty() {
            return Ok(Vec::new());
        }

        self.store.set_many(&updates).await?;

        for (kind, cursor) in &updates {
            self.cursors.insert(*kind, *cursor);
        }
        Ok(updates.into_iter().map(|(kind, _)| kind).collect())
    }
}

//! JSON file implementation of the watermark store.
//!
//! The state file is a flat JSON object, two keys per entity type:
//!
//! ```json
//! {
//!   "last_modified_person": "2021-06-16T20:14:09.221855+00:00",
//!   "last_person_id": "00af52ec-9345-4d66-adbe-50eb917f463a"
//! }
//! ```
//!
//! Every write replaces the whole file through a temporary file that is
//! flushed to disk before it is renamed over the old state, so a crash never
//! leaves a half-written state behind. A missing file means no cursor was ever
//! stored; an empty or malformed file is an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movies_indexer_shared::{Cursor, EntityKind};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::WatermarkError;
use crate::interfaces::WatermarkStore;

type State = Map<String, Value>;

/// Watermark store persisting all cursors in one JSON file.
pub struct JsonFileWatermarkStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileWatermarkStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directory are created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key holding the timestamp half of a cursor.
    pub fn modified_key(kind: EntityKind) -> String {
        format!("last_modified_{}", kind.as_str())
    }

    /// Key holding the id half of a cursor.
    pub fn id_key(kind: EntityKind) -> String {
        format!("last_{}_id", kind.as_str())
    }

    async fn read_state(&self) -> Result<State, WatermarkError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(State::new()),
            Err(e) => return Err(e.into()),
        };

        // Only a missing file means "never synced"; an empty one was truncated.
        if contents.trim().is_empty() {
            return Err(WatermarkError::invalid_value(
                self.path.display().to_string(),
                "state file is empty",
            ));
        }

        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(state) => Ok(state),
            other => Err(WatermarkError::invalid_value(
                self.path.display().to_string(),
                format!("expected a JSON object, found {}", other),
            )),
        }
    }

    async fn write_state(&self, state: &State) -> Result<(), WatermarkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    fn insert_cursor(state: &mut State, kind: EntityKind, cursor: Cursor) {
        state.insert(
            Self::modified_key(kind),
            Value::String(cursor.modified_at.to_rfc3339()),
        );
        state.insert(Self::id_key(kind), Value::String(cursor.id.to_string()));
    }

    fn parse_cursor(state: &State, kind: EntityKind) -> Result<Option<Cursor>, WatermarkError> {
        let modified_key = Self::modified_key(kind);
        let id_key = Self::id_key(kind);

        let (modified_at, id) = match (state.get(&modified_key), state.get(&id_key)) {
            (None, None) => return Ok(None),
            (Some(modified_at), Some(id)) => (modified_at, id),
            (None, Some(_)) => {
                return Err(WatermarkError::invalid_value(modified_key, "missing while id is present"))
            }
            (Some(_), None) => {
                return Err(WatermarkError::invalid_value(id_key, "missing while timestamp is present"))
            }
        };

        let modified_at = modified_at
            .as_str()
            .ok_or_else(|| WatermarkError::invalid_value(&modified_key, "expected a string"))
            .and_then(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| WatermarkError::invalid_value(&modified_key, e.to_string()))
            })?;

        let id = id
            .as_str()
            .ok_or_else(|| WatermarkError::invalid_value(&id_key, "expected a string"))
            .and_then(|s| {
                Uuid::parse_str(s).map_err(|e| WatermarkError::invalid_value(&id_key, e.to_string()))
            })?;

        Ok(Some(Cursor::new(modified_at, id)))
    }
}

#[async_trait]
impl WatermarkStore for JsonFileWatermarkStore {
    async fn get(&self, kind: EntityKind) -> Result<Option<Cursor>, WatermarkError> {
        let _guard = self.lock.lock().await;
        let state = self.read_state().await?;
        Self::parse_cursor(&state, kind)
    }

    async fn set(&self, kind: EntityKind, cursor: Cursor) -> Result<(), WatermarkError> {
        self.set_many(&[(kind, cursor)]).await
    }

    /// Write every cursor in one file replacement.
    async fn set_many(&self, cursors: &[(EntityKind, Cursor)]) -> Result<(), WatermarkError> {
        if cursors.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        for (kind, cursor) in cursors {
            Self::insert_cursor(&mut state, *kind, *cursor);
        }
        self.write_state(&state).await?;

        debug!(
            path = %self.path.display(),
            count = cursors.len(),
            "Persisted watermarks"
        );
        Ok(())
    }
}

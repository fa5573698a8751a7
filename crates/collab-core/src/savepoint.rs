//! Named snapshots with metadata and a queryable store.
//!
//! A [`Savepoint`] pins a rope (cheap: ropes share structure), the history
//! revision it was taken at, a wall-clock timestamp and free-form metadata.
//! The [`SavepointStore`] deduplicates by 32-bit content hash: creating a
//! savepoint whose content matches an existing one coalesces onto the
//! existing entry and returns its id.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::history::History;
use crate::rope::Rope;

/// Who/what/why metadata attached to a savepoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavepointMeta {
    /// The user that created the savepoint.
    pub user_id: Option<String>,
    /// The view (split, window) the savepoint belongs to.
    pub view_id: Option<String>,
    /// Free-form tags for lookup.
    pub tags: Vec<String>,
    /// Human-readable description.
    pub description: Option<String>,
}

/// A named snapshot of a document.
#[derive(Clone)]
pub struct Savepoint {
    id: String,
    rope: Rope,
    revision_id: isize,
    timestamp: SystemTime,
    content_hash: u32,
    meta: SavepointMeta,
}

impl Savepoint {
    /// The store key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The snapshotted document.
    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The history revision index at snapshot time.
    pub fn revision_id(&self) -> isize {
        self.revision_id
    }

    /// Wall-clock creation time.
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// 32-bit content hash used for deduplication.
    pub fn content_hash(&self) -> u32 {
        self.content_hash
    }

    /// Attached metadata.
    pub fn meta(&self) -> &SavepointMeta {
        &self.meta
    }
}

/// A concurrent-safe store of savepoints keyed by id.
pub struct SavepointStore {
    inner: RwLock<HashMap<String, Savepoint>>,
    history: Option<Arc<History>>,
}

impl SavepointStore {
    /// An empty store without history notifications.
    pub fn new() -> Self {
        SavepointStore {
            inner: RwLock::new(HashMap::new()),
            history: None,
        }
    }

    /// An empty store that fires the history's savepoint hook points on
    /// create and restore.
    pub fn with_history(history: Arc<History>) -> Self {
        SavepointStore {
            inner: RwLock::new(HashMap::new()),
            history: Some(history),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Savepoint>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Savepoint>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Creates a savepoint, returning the id actually holding the content.
    ///
    /// If a stored savepoint already has the same content hash the insert
    /// coalesces and the existing id is returned; an insert under an
    /// existing id overwrites that entry.
    pub fn create(
        &self,
        id: &str,
        rope: &Rope,
        revision_id: isize,
        meta: SavepointMeta,
    ) -> String {
        let content_hash = rope.hash32();
        {
            let mut store = self.write();
            if let Some(existing) = store
                .values()
                .find(|savepoint| savepoint.content_hash == content_hash)
            {
                let existing_id = existing.id.clone();
                tracing::debug!(id, existing = %existing_id, "savepoint deduplicated");
                return existing_id;
            }
            store.insert(
                id.to_string(),
                Savepoint {
                    id: id.to_string(),
                    rope: rope.clone(),
                    revision_id,
                    timestamp: SystemTime::now(),
                    content_hash,
                    meta,
                },
            );
        }
        tracing::debug!(id, revision = revision_id, "savepoint created");
        if let Some(history) = &self.history {
            history.notify_savepoint_created();
        }
        id.to_string()
    }

    /// Restores the savepoint `id`, returning its snapshot.
    ///
    /// The live document must have the same UTF-16 length as the snapshot
    /// (navigate the history back to the savepoint's revision first); a
    /// disagreement is a [`Error::LengthMismatch`].
    pub fn restore(&self, id: &str, current: &Rope) -> Result<Rope> {
        let snapshot = {
            let store = self.read();
            match store.get(id) {
                Some(savepoint) => savepoint.rope.clone(),
                None => {
                    return Err(Error::InvalidInput {
                        parameter: "id",
                        reason: "unknown savepoint",
                        value: id.to_string(),
                    });
                }
            }
        };
        if snapshot.len_utf16() != current.len_utf16() {
            return Err(Error::LengthMismatch {
                expected: snapshot.len_utf16(),
                actual: current.len_utf16(),
            });
        }
        tracing::debug!(id, "savepoint restored");
        if let Some(history) = &self.history {
            history.notify_savepoint_restored();
        }
        Ok(snapshot)
    }

    /// Looks up a savepoint by id.
    pub fn get(&self, id: &str) -> Option<Savepoint> {
        self.read().get(id).cloned()
    }

    /// Every savepoint, ordered by creation time.
    pub fn list(&self) -> Vec<Savepoint> {
        let mut savepoints: Vec<Savepoint> = self.read().values().cloned().collect();
        savepoints.sort_by_key(|savepoint| savepoint.timestamp);
        savepoints
    }

    /// Removes a savepoint; `true` if it existed.
    pub fn delete(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    /// Number of stored savepoints.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` when the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Savepoints carrying `tag`.
    pub fn by_tag(&self, tag: &str) -> Vec<Savepoint> {
        self.filtered(|savepoint| savepoint.meta.tags.iter().any(|t| t == tag))
    }

    /// Savepoints created by `user_id`.
    pub fn by_user(&self, user_id: &str) -> Vec<Savepoint> {
        self.filtered(|savepoint| savepoint.meta.user_id.as_deref() == Some(user_id))
    }

    /// Savepoints belonging to `view_id`.
    pub fn by_view(&self, view_id: &str) -> Vec<Savepoint> {
        self.filtered(|savepoint| savepoint.meta.view_id.as_deref() == Some(view_id))
    }

    /// Savepoints created within `[from, to]`.
    pub fn in_time_range(&self, from: SystemTime, to: SystemTime) -> Vec<Savepoint> {
        self.filtered(|savepoint| savepoint.timestamp >= from && savepoint.timestamp <= to)
    }

    /// The savepoint with the given content hash, if any.
    pub fn by_hash(&self, content_hash: u32) -> Option<Savepoint> {
        self.read()
            .values()
            .find(|savepoint| savepoint.content_hash == content_hash)
            .cloned()
    }

    fn filtered<F: Fn(&Savepoint) -> bool>(&self, keep: F) -> Vec<Savepoint> {
        let mut savepoints: Vec<Savepoint> =
            self.read().values().filter(|s| keep(s)).cloned().collect();
        savepoints.sort_by_key(|savepoint| savepoint.timestamp);
        savepoints
    }
}

impl Default for SavepointStore {
    fn default() -> Self {
        SavepointStore::new()
    }
}

//! Store interfaces consumed by the core, with in-memory reference
//! implementations.
//!
//! The core needs exactly two collaborators from the outside world: a
//! content store for blobs (snapshots, documents) and an append-only
//! history log for change records. Both traits are object-safe and return
//! `io::Result` so implementations can surface transport failures.

use std::collections::HashMap;
use std::io;
use std::sync::RwLock;

/// A key/value blob store.
pub trait ContentStore: Send + Sync {
    /// Fetches the bytes stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: Vec<u8>) -> io::Result<()>;

    /// Removes `key`; returns `true` if it existed.
    fn delete(&self, key: &str) -> io::Result<bool>;

    /// Lists every key starting with `prefix`, in sorted order.
    fn list(&self, prefix: &str) -> io::Result<Vec<String>>;
}

/// An append-only log of change records per document.
pub trait HistoryLog: Send + Sync {
    /// Appends a change record for `doc_id` at `revision_id`.
    fn append(&self, doc_id: &str, revision_id: u64, change_bytes: &[u8]) -> io::Result<()>;

    /// Fetches the change records of `doc_id` with revision ids in
    /// `[from, to)`, in revision order.
    fn range(&self, doc_id: &str, from: u64, to: u64) -> io::Result<Vec<Vec<u8>>>;
}

/// Heap-backed [`ContentStore`] for tests and tools.
#[derive(Default)]
pub struct MemoryContentStore {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> io::Result<()> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key.to_string(), bytes);
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<bool> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        Ok(map.remove(key).is_some())
    }

    fn list(&self, prefix: &str) -> io::Result<Vec<String>> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = map
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Heap-backed [`HistoryLog`] for tests and tools.
#[derive(Default)]
pub struct MemoryHistoryLog {
    inner: RwLock<HashMap<String, Vec<(u64, Vec<u8>)>>>,
}

impl MemoryHistoryLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryLog for MemoryHistoryLog {
    fn append(&self, doc_id: &str, revision_id: u64, change_bytes: &[u8]) -> io::Result<()> {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.entry(doc_id.to_string())
            .or_default()
            .push((revision_id, change_bytes.to_vec()));
        Ok(())
    }

    fn range(&self, doc_id: &str, from: u64, to: u64) -> io::Result<Vec<Vec<u8>>> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let Some(records) = map.get(doc_id) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<(u64, Vec<u8>)> = records
            .iter()
            .filter(|(revision, _)| *revision >= from && *revision < to)
            .cloned()
            .collect();
        hits.sort_by_key(|(revision, _)| *revision);
        Ok(hits.into_iter().map(|(_, bytes)| bytes).collect())
    }
}

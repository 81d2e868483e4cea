//! In-memory table repository for testing.
//!
//! This adapter provides a pure in-memory implementation of TableRepository,
//! enabling fast tests without any file system I/O. Blobs are stored as the
//! same JSON bytes the file adapter writes, so raw legacy or corrupt blobs can
//! be planted with [`InMemoryRepository::insert_raw`].

use std::{collections::HashMap, path::Path, sync::Arc};

use parking_lot::Mutex;

use crate::{Result, error::Error, ports::TableRepository, q_learning::PersistedTable};

/// In-memory repository for testing.
///
/// # Examples
///
/// ```
/// use skirmish::adapters::InMemoryRepository;
/// use skirmish::ports::TableRepository;
/// use skirmish::q_learning::{DEFAULT_PRECISION, PersistedTable, QLearningAgent};
/// use std::path::Path;
///
/// let repo = InMemoryRepository::new();
/// let table = PersistedTable::from_agent(&QLearningAgent::new(), None, DEFAULT_PRECISION);
///
/// // Save to "memory" (not disk)
/// repo.save(&table, Path::new("qtable"))?;
///
/// // Load from "memory"
/// let loaded = repo.load(Path::new("qtable"))?;
/// assert_eq!(loaded, table);
/// # Ok::<(), skirmish::Error>(())
/// ```
///
/// # Thread Safety
///
/// This repository is thread-safe and can be safely cloned and shared across
/// threads. All clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    /// Get the number of blobs currently stored.
    pub fn count(&self) -> usize {
        self.storage.lock().len()
    }

    /// Clear all stored blobs.
    pub fn clear(&self) {
        self.storage.lock().clear();
    }

    /// Check if a blob exists at the given path.
    pub fn contains(&self, path: &Path) -> bool {
        self.storage.lock().contains_key(&Self::key(path))
    }

    /// Locations currently stored, sorted
    pub fn locations(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Store raw bytes as if an external writer had produced them.
    pub fn insert_raw(&self, path: &Path, bytes: impl Into<Vec<u8>>) {
        self.storage.lock().insert(Self::key(path), bytes.into());
    }
}

impl TableRepository for InMemoryRepository {
    fn save(&self, table: &PersistedTable, path: &Path) -> Result<()> {
        let bytes = table.to_json_vec()?;
        self.storage.lock().insert(Self::key(path), bytes);
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<PersistedTable> {
        let key = Self::key(path);
        let bytes = self
            .storage
            .lock()
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound { location: key })?;
        PersistedTable::from_json_slice(&bytes)
    }
}

//! Repository port for Q-table persistence.
//!
//! This module defines the trait boundary between the domain and infrastructure
//! layers for table storage and retrieval. The engine only needs a key-value
//! blob store: a location goes in, a [`PersistedTable`] comes out.

use std::path::Path;

use tracing::warn;

use crate::{Result, q_learning::PersistedTable};

/// Port for persisting and loading learned Q-tables.
///
/// This trait abstracts the storage mechanism, allowing different implementations
/// (JSON, MessagePack, in-memory) without coupling the domain logic to
/// specific serialization formats.
///
/// # Examples
///
/// ```no_run
/// use skirmish::{ports::TableRepository, q_learning::PersistedTable};
/// use std::path::Path;
///
/// fn save_table<R: TableRepository>(
///     repo: &R,
///     table: &PersistedTable,
///     path: &Path,
/// ) -> skirmish::Result<()> {
///     repo.save(table, path)
/// }
/// ```
pub trait TableRepository: Send + Sync {
    /// Save a table snapshot to persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The location cannot be created or written to
    /// - Serialization fails
    fn save(&self, table: &PersistedTable, path: &Path) -> Result<()>;

    /// Load a table snapshot from persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Nothing is stored at the location
    /// - The stored blob is malformed
    fn load(&self, path: &Path) -> Result<PersistedTable>;

    /// Load a snapshot, treating any failure as "no prior table".
    ///
    /// Failures are logged rather than returned: a missing or corrupt blob
    /// must never stop training from starting.
    fn load_or_empty(&self, path: &Path) -> Option<PersistedTable> {
        match self.load(path) {
            Ok(table) => Some(table),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unusable Q-table");
                None
            }
        }
    }
}

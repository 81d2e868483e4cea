//! MessagePack implementation of the table repository.
//!
//! This adapter implements the TableRepository port using rmp_serde for
//! compact binary checkpoints. Fields are written by name so optional
//! wrapper fields survive the round trip.

use std::path::Path;

use super::json_repository::{read_blob, write_atomically};
use crate::{Result, ports::TableRepository, q_learning::PersistedTable};

/// MessagePack-based table repository.
///
/// Provides persistent storage using the MessagePack binary format via rmp_serde.
/// Checkpoints are considerably smaller than the equivalent JSON.
///
/// # Examples
///
/// ```no_run
/// use skirmish::adapters::MsgPackRepository;
/// use skirmish::ports::TableRepository;
/// use skirmish::q_learning::{DEFAULT_PRECISION, PersistedTable, QLearningAgent};
/// use std::path::Path;
///
/// let repo = MsgPackRepository;
/// let table = PersistedTable::from_agent(&QLearningAgent::new(), None, DEFAULT_PRECISION);
///
/// repo.save(&table, Path::new("trained.msgpack"))?;
/// let loaded = repo.load(Path::new("trained.msgpack"))?;
/// # Ok::<(), skirmish::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackRepository;

impl MsgPackRepository {
    /// Create a new MessagePack repository.
    pub fn new() -> Self {
        Self
    }
}

impl TableRepository for MsgPackRepository {
    fn save(&self, table: &PersistedTable, path: &Path) -> Result<()> {
        write_atomically(path, &table.to_msgpack_vec()?)
    }

    fn load(&self, path: &Path) -> Result<PersistedTable> {
        PersistedTable::from_msgpack_slice(&read_blob(path)?)
    }
}

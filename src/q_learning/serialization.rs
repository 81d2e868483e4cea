//! Persisted Q-table format.
//!
//! The blob external collaborators read and write looks like
//!
//! ```json
//! {
//!   "version": 12,
//!   "q": { "30|0|30|0|0": [0.1, -0.2, 0.3] },
//!   "meta": { "reachableMax": 1234, "coveragePct": 87.5,
//!             "minVisits": 1, "maxVisits": 900, "avgVisits": 14.2 },
//!   "visits": { "30|0|30|0|0": 900 }
//! }
//! ```
//!
//! Older blobs are a bare `{ key: [..] }` map with no wrapper; they load as
//! version 0 with no metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    agent::QLearningAgent,
    q_table::{QRow, QTable},
    visits::{VisitCounter, VisitStats},
};
use crate::{
    error::{Error, Result},
    game::ACTION_COUNT,
    identifiers::StateKey,
};

/// Default number of decimals kept when persisting Q-values
pub const DEFAULT_PRECISION: u32 = 4;

/// Summary statistics stored next to the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    /// Size of the reachable state set for the rules the table was trained on
    pub reachable_max: usize,
    /// Share of reachable states visited at least once, in percent
    pub coverage_pct: f64,
    pub min_visits: u64,
    pub max_visits: u64,
    pub avg_visits: f64,
    /// RFC 3339 timestamp of the save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    /// Episode the snapshot was taken after
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<usize>,
}

impl TableMeta {
    pub fn new(stats: VisitStats, reachable_max: usize, coverage_pct: f64) -> Self {
        Self {
            reachable_max,
            coverage_pct,
            min_visits: stats.min,
            max_visits: stats.max,
            avg_visits: stats.avg,
            saved_at: None,
            episode: None,
        }
    }

    pub fn with_saved_at(mut self, saved_at: impl Into<String>) -> Self {
        self.saved_at = Some(saved_at.into());
        self
    }

    pub fn with_episode(mut self, episode: usize) -> Self {
        self.episode = Some(episode);
        self
    }
}

/// Versioned, rounded snapshot of a learned table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTable {
    pub version: u64,
    pub q: BTreeMap<StateKey, [f64; ACTION_COUNT]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<TableMeta>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub visits: BTreeMap<StateKey, u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Wrapped(PersistedTable),
    Legacy(BTreeMap<StateKey, [f64; ACTION_COUNT]>),
}

impl From<StoredShape> for PersistedTable {
    fn from(shape: StoredShape) -> Self {
        match shape {
            StoredShape::Wrapped(table) => table,
            StoredShape::Legacy(q) => PersistedTable {
                version: 0,
                q,
                meta: None,
                visits: BTreeMap::new(),
            },
        }
    }
}

impl PersistedTable {
    /// Snapshot an agent, rounding values to `precision` decimals
    pub fn from_agent(agent: &QLearningAgent, meta: Option<TableMeta>, precision: u32) -> Self {
        let rounded = agent.table().rounded(precision);
        Self {
            version: agent.version(),
            q: rounded
                .iter()
                .map(|(key, row)| (key.clone(), row.values()))
                .collect(),
            meta,
            visits: agent
                .visits()
                .iter()
                .map(|(key, count)| (key.clone(), count))
                .collect(),
        }
    }

    /// Rebuild an agent from the snapshot
    pub fn to_agent(&self) -> QLearningAgent {
        let table: QTable = self
            .q
            .iter()
            .map(|(key, values)| (key.clone(), QRow::new(*values)))
            .collect();
        let visits: VisitCounter = self
            .visits
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect();
        QLearningAgent::from_parts(table, visits, self.version)
    }

    /// Parse JSON in either the wrapped or the legacy bare-map shape
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let shape: StoredShape =
            serde_json::from_slice(bytes).map_err(|e| Error::SerializationContext {
                operation: "parse persisted Q-table".to_string(),
                message: e.to_string(),
            })?;
        Ok(shape.into())
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Encode as MessagePack with named fields
    pub fn to_msgpack_vec(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::SerializationContext {
            operation: "serialize Q-table to MessagePack".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_msgpack_slice(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::SerializationContext {
            operation: "deserialize Q-table from MessagePack".to_string(),
            message: e.to_string(),
        })
    }
}

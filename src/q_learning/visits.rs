//! Visit counting

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identifiers::StateKey;

/// How often each state was entered during training.
///
/// Counts drive adaptive learning rates, the intrinsic exploration bonus and
/// pruning eligibility. Creating a Q-row or answering a policy query is not a
/// visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitCounter {
    counts: HashMap<StateKey, u64>,
}

/// Summary of visit counts over all recorded states
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitStats {
    pub min: u64,
    pub max: u64,
    pub avg: f64,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry into `key`; returns the updated count
    pub fn record(&mut self, key: &StateKey) -> u64 {
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Visits for `key` (0 if never entered)
    pub fn get(&self, key: &StateKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Overwrite the count for `key`
    pub fn set(&mut self, key: StateKey, count: u64) {
        self.counts.insert(key, count);
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, u64)> {
        self.counts.iter().map(|(key, count)| (key, *count))
    }

    pub fn stats(&self) -> VisitStats {
        if self.counts.is_empty() {
            return VisitStats::default();
        }
        let total: u64 = self.counts.values().sum();
        VisitStats {
            min: self.counts.values().copied().min().unwrap_or(0),
            max: self.counts.values().copied().max().unwrap_or(0),
            avg: total as f64 / self.counts.len() as f64,
        }
    }
}

impl FromIterator<(StateKey, u64)> for VisitCounter {
    fn from_iter<I: IntoIterator<Item = (StateKey, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

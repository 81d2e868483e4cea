//! Q-table implementation for temporal difference learning

use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

use super::visits::VisitCounter;
use crate::{
    game::{ACTION_COUNT, Action},
    identifiers::StateKey,
};

/// Per-action value estimates for one state, indexed by [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QRow(pub [f64; ACTION_COUNT]);

impl QRow {
    pub fn new(values: [f64; ACTION_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> [f64; ACTION_COUNT] {
        self.0
    }

    /// Highest-valued action; ties go to the lowest index.
    pub fn argmax(&self) -> Action {
        let mut best = 0;
        for index in 1..ACTION_COUNT {
            if self.0[index] > self.0[best] {
                best = index;
            }
        }
        Action::ALL[best]
    }

    /// Largest value in the row.
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest absolute value in the row.
    pub fn max_abs(&self) -> f64 {
        self.0.iter().map(|v| v.abs()).fold(0.0, f64::max)
    }
}

impl Index<Action> for QRow {
    type Output = f64;

    fn index(&self, action: Action) -> &f64 {
        &self.0[action.index()]
    }
}

impl IndexMut<Action> for QRow {
    fn index_mut(&mut self, action: Action) -> &mut f64 {
        &mut self.0[action.index()]
    }
}

/// Q-table mapping state keys to per-action values
///
/// Rows are created lazily. [`QTable::row`] inserts a zero row for an unseen
/// key and returns the stored row, so later reads see the same values.
/// [`QTable::get`] is the read-only counterpart used by greedy players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    rows: HashMap<StateKey, QRow>,
}

impl QTable {
    /// Create an empty Q-table
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Get the row for `key`, inserting a zero row if it does not exist
    pub fn row(&mut self, key: &StateKey) -> &mut QRow {
        self.rows.entry(key.clone()).or_default()
    }

    /// Get the row for `key` without creating it
    pub fn get(&self, key: &StateKey) -> Option<&QRow> {
        self.rows.get(key)
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.rows.contains_key(key)
    }

    /// Replace the row for `key`
    pub fn insert(&mut self, key: StateKey, row: QRow) {
        self.rows.insert(key, row);
    }

    pub fn remove(&mut self, key: &StateKey) -> Option<QRow> {
        self.rows.remove(key)
    }

    /// Greedy action for a known state, `None` if the state was never seen
    pub fn greedy_action(&self, key: &StateKey) -> Option<Action> {
        self.get(key).map(QRow::argmax)
    }

    /// Q-learning update: off-policy TD control
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]
    ///
    /// The bootstrap term is dropped when `done`. Both rows exist afterwards,
    /// also when `key == next_key`. Returns the TD error.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        key: &StateKey,
        action: Action,
        reward: f64,
        next_key: &StateKey,
        done: bool,
        gamma: f64,
        alpha: f64,
    ) -> f64 {
        let next_max = self.row(next_key).max();
        let target = if done {
            reward
        } else {
            reward + gamma * next_max
        };
        let row = self.row(key);
        let td_error = target - row[action];
        row[action] += alpha * td_error;
        td_error
    }

    /// Drop rows that are both rarely visited and uninformative.
    ///
    /// A row goes only when its visit count is at most `min_visits` AND its
    /// largest absolute value is at most `max_abs`. Returns the number removed.
    pub fn prune(&mut self, visits: &VisitCounter, min_visits: u64, max_abs: f64) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|key, row| visits.get(key) > min_visits || row.max_abs() > max_abs);
        before - self.rows.len()
    }

    /// Copy of the table with every value rounded to `decimals` places
    pub fn rounded(&self, decimals: u32) -> Self {
        let factor = 10f64.powi(decimals as i32);
        Self {
            rows: self
                .rows
                .iter()
                .map(|(key, row)| {
                    let values = row.0.map(|v| (v * factor).round() / factor);
                    (key.clone(), QRow(values))
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &QRow)> {
        self.rows.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.rows.keys()
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(StateKey, QRow)> for QTable {
    fn from_iter<I: IntoIterator<Item = (StateKey, QRow)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

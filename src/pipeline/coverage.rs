//! State-space reachability and coverage tracking
//!
//! Coverage is measured against the set of states reachable from the initial
//! state when both sides attack with their full charge, which is how the
//! learner and every built-in opponent play. Reachable sets depend only on the
//! [`GameRules`], so they are memoised per rules value in a
//! [`ReachabilityCache`] owned by whoever needs it.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    game::{Action, Decision, GameRules},
    identifiers::StateKey,
};

/// Breadth-first search over all nine action pairs from the initial state
///
/// Terminal states are included but not expanded.
pub fn compute_reachable(rules: &GameRules) -> HashSet<StateKey> {
    let start = rules.initial_state();
    let mut reachable = HashSet::new();
    let mut frontier = VecDeque::new();

    reachable.insert(start.key());
    frontier.push_back(start);

    while let Some(state) = frontier.pop_front() {
        for learner in Action::ALL {
            for opponent in Action::ALL {
                let t = rules.step(
                    &state,
                    Decision::full_charge(learner, state.player_charge),
                    Decision::full_charge(opponent, state.enemy_charge),
                );
                if reachable.insert(t.next.key()) && !t.done {
                    frontier.push_back(t.next);
                }
            }
        }
    }

    reachable
}

/// `|visited ∩ reachable| / |reachable| · 100`, or 0 for an empty reachable set
pub fn coverage_pct<'a>(
    visited: impl IntoIterator<Item = &'a StateKey>,
    reachable: &HashSet<StateKey>,
) -> f64 {
    if reachable.is_empty() {
        return 0.0;
    }
    let hits = visited
        .into_iter()
        .filter(|key| reachable.contains(*key))
        .collect::<HashSet<_>>()
        .len();
    hits as f64 / reachable.len() as f64 * 100.0
}

/// Memoised reachable sets keyed by the rules that produced them
#[derive(Debug, Default)]
pub struct ReachabilityCache {
    sets: Mutex<HashMap<GameRules, Arc<HashSet<StateKey>>>>,
}

impl ReachabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reachable set for `rules`, computed on first request
    pub fn get(&self, rules: &GameRules) -> Arc<HashSet<StateKey>> {
        let mut sets = self.sets.lock();
        if let Some(set) = sets.get(rules) {
            return Arc::clone(set);
        }
        let set = Arc::new(compute_reachable(rules));
        debug!(states = set.len(), ?rules, "computed reachable state set");
        sets.insert(*rules, Arc::clone(&set));
        set
    }

    /// Number of distinct rule sets memoised
    pub fn len(&self) -> usize {
        self.sets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.lock().is_empty()
    }

    pub fn clear(&self) {
        self.sets.lock().clear();
    }
}

/// Tracks which reachable states training has entered
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    reachable: Arc<HashSet<StateKey>>,
    visited: HashSet<StateKey>,
    episodes_since_discovery: usize,
    discovered_this_episode: bool,
}

impl CoverageTracker {
    pub fn new(reachable: Arc<HashSet<StateKey>>) -> Self {
        Self {
            reachable,
            visited: HashSet::new(),
            episodes_since_discovery: 0,
            discovered_this_episode: false,
        }
    }

    /// Record that training entered `key`; true if it is a newly seen reachable state
    pub fn observe(&mut self, key: &StateKey) -> bool {
        if !self.reachable.contains(key) || self.visited.contains(key) {
            return false;
        }
        self.visited.insert(key.clone());
        self.discovered_this_episode = true;
        true
    }

    /// Mark previously visited states (e.g. from a loaded table) as covered
    ///
    /// Does not count as a discovery for the stagnation counter.
    pub fn seed_from<'a>(&mut self, keys: impl IntoIterator<Item = &'a StateKey>) {
        for key in keys {
            if self.reachable.contains(key) {
                self.visited.insert(key.clone());
            }
        }
    }

    /// Close the current episode and update the stagnation counter
    pub fn end_episode(&mut self) {
        if self.discovered_this_episode {
            self.episodes_since_discovery = 0;
        } else {
            self.episodes_since_discovery += 1;
        }
        self.discovered_this_episode = false;
    }

    /// Consecutive completed episodes without a new reachable state
    pub fn episodes_since_discovery(&self) -> usize {
        self.episodes_since_discovery
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    /// Coverage as a fraction in `[0, 1]`
    pub fn coverage_fraction(&self) -> f64 {
        if self.reachable.is_empty() {
            0.0
        } else {
            self.visited.len() as f64 / self.reachable.len() as f64
        }
    }

    /// Coverage in percent
    pub fn coverage_pct(&self) -> f64 {
        self.coverage_fraction() * 100.0
    }
}

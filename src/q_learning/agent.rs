//! Q-learning agent
//!
//! The agent owns the learned table, the visit counts and the table version.
//! It is used by the training loop, by evaluation (read-only) and by the
//! policy service.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

use super::{
    q_table::{QRow, QTable},
    visits::VisitCounter,
};
use crate::{
    game::{Action, Decision, GameState},
    identifiers::StateKey,
};

/// Build a seeded RNG, or one seeded from entropy when no seed is given
pub fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Q-learning agent (off-policy TD control)
///
/// Learns the optimal Q* function by always updating toward the maximum
/// next-state value, regardless of the action the learner actually takes
/// next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QLearningAgent {
    table: QTable,
    visits: VisitCounter,
    version: u64,
}

impl QLearningAgent {
    /// Create an agent with an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an agent from previously learned parts
    pub fn from_parts(table: QTable, visits: VisitCounter, version: u64) -> Self {
        Self {
            table,
            visits,
            version,
        }
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.table
    }

    pub fn visits(&self) -> &VisitCounter {
        &self.visits
    }

    /// Number of learning batches applied to the table
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Mark one batch of updates as complete
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Action to play in a state the table has never seen
    ///
    /// Attacking with charge in hand beats charging blind; without charge an
    /// attack does nothing, so charge instead.
    pub fn fallback_action(state: &GameState) -> Action {
        if state.player_charge > 0 {
            Action::Attack
        } else {
            Action::Charge
        }
    }

    /// Greedy action, falling back to [`Self::fallback_action`] for unseen states
    pub fn greedy_action(&self, state: &GameState) -> Action {
        self.table
            .greedy_action(&state.key())
            .unwrap_or_else(|| Self::fallback_action(state))
    }

    /// ε-greedy action selection
    ///
    /// A negative epsilon never explores.
    pub fn select_action(&self, state: &GameState, epsilon: f64, rng: &mut StdRng) -> Action {
        if epsilon > 0.0 && rng.random::<f64>() < epsilon {
            // Explore: random action
            *Action::ALL.choose(rng).unwrap_or(&Action::Charge)
        } else {
            // Exploit: greedy action based on Q-values
            self.greedy_action(state)
        }
    }

    /// ε-greedy decision; attacks always commit the full charge
    pub fn decide(&self, state: &GameState, epsilon: f64, rng: &mut StdRng) -> Decision {
        let action = self.select_action(state, epsilon, rng);
        Decision::full_charge(action, state.player_charge)
    }

    /// Record that the learner entered `key`; returns the new visit count
    pub fn record_visit(&mut self, key: &StateKey) -> u64 {
        self.visits.record(key)
    }

    /// Apply one temporal-difference update; returns the TD error
    #[allow(clippy::too_many_arguments)]
    pub fn learn(
        &mut self,
        key: &StateKey,
        action: Action,
        reward: f64,
        next_key: &StateKey,
        done: bool,
        gamma: f64,
        alpha: f64,
    ) -> f64 {
        self.table.update(key, action, reward, next_key, done, gamma, alpha)
    }

    /// Current row for `key`, created with zeros if absent (not a visit)
    pub fn query(&mut self, key: &StateKey) -> QRow {
        *self.table.row(key)
    }

    /// Remove low-visit, near-zero rows; returns the number removed
    pub fn prune(&mut self, min_visits: u64, max_abs: f64) -> usize {
        self.table.prune(&self.visits, min_visits, max_abs)
    }

    /// Number of stored rows
    pub fn q_table_size(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameRules;

    #[test]
    fn test_fallback_prefers_attack_when_charged() {
        let state = GameState::new(30, 1, 30, 0, 1);
        assert_eq!(QLearningAgent::fallback_action(&state), Action::Attack);
        let empty = GameRules::default().initial_state();
        assert_eq!(QLearningAgent::fallback_action(&empty), Action::Charge);
    }

    #[test]
    fn test_greedy_uses_table_when_known() {
        let mut agent = QLearningAgent::new();
        let state = GameState::new(30, 1, 30, 0, 1);
        agent
            .table_mut()
            .insert(state.key(), QRow::new([0.0, 0.4, 0.1]));
        assert_eq!(agent.greedy_action(&state), Action::Defend);
    }

    #[test]
    fn test_negative_epsilon_never_explores() {
        let mut agent = QLearningAgent::new();
        let state = GameState::new(30, 1, 30, 0, 1);
        agent
            .table_mut()
            .insert(state.key(), QRow::new([0.0, 0.0, 0.9]));
        let mut rng = build_rng(Some(3));
        for _ in 0..200 {
            assert_eq!(agent.select_action(&state, -1.0, &mut rng), Action::Charge);
        }
    }

    #[test]
    fn test_full_exploration_reaches_every_action() {
        let agent = QLearningAgent::new();
        let state = GameRules::default().initial_state();
        let mut rng = build_rng(Some(9));
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[agent.select_action(&state, 1.0, &mut rng).index()] = true;
        }
        assert_eq!(seen, [true; 3]);
    }

    #[test]
    fn test_query_creates_row_without_visit() {
        let mut agent = QLearningAgent::new();
        let key = StateKey::new("30|0|30|0|0");
        assert_eq!(agent.query(&key), QRow::default());
        assert_eq!(agent.q_table_size(), 1);
        assert_eq!(agent.visits().get(&key), 0);
    }

    #[test]
    fn test_version_bumps_by_one() {
        let mut agent = QLearningAgent::new();
        assert_eq!(agent.bump_version(), 1);
        assert_eq!(agent.bump_version(), 2);
        assert_eq!(agent.version(), 2);
    }
}

//! Game state value type

use serde::{Deserialize, Serialize};

use super::rules::GameRules;

/// Snapshot of a duel between the learner ("player") and its opponent ("enemy").
///
/// States are immutable values; the game model returns a fresh state for
/// every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GameState {
    pub player_hp: u32,
    pub player_charge: u32,
    pub enemy_hp: u32,
    pub enemy_charge: u32,
    pub turn: u32,
}

impl GameState {
    pub fn new(
        player_hp: u32,
        player_charge: u32,
        enemy_hp: u32,
        enemy_charge: u32,
        turn: u32,
    ) -> Self {
        Self {
            player_hp,
            player_charge,
            enemy_hp,
            enemy_charge,
            turn,
        }
    }

    /// Clamp HP and charge into the ranges allowed by `rules`.
    ///
    /// States decoded from damaged keys can carry arbitrary numbers; the game
    /// model clamps instead of rejecting them.
    pub fn clamped(&self, rules: &GameRules) -> Self {
        Self {
            player_hp: self.player_hp.min(rules.max_hp),
            player_charge: self.player_charge.min(rules.max_charge),
            enemy_hp: self.enemy_hp.min(rules.max_hp),
            enemy_charge: self.enemy_charge.min(rules.max_charge),
            turn: self.turn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_respects_rules() {
        let rules = GameRules::default();
        let wild = GameState::new(999, 42, 31, 4, 7);
        let clamped = wild.clamped(&rules);
        assert_eq!(clamped.player_hp, rules.max_hp);
        assert_eq!(clamped.player_charge, rules.max_charge);
        assert_eq!(clamped.enemy_hp, rules.max_hp);
        assert_eq!(clamped.enemy_charge, rules.max_charge);
        assert_eq!(clamped.turn, 7);
    }
}

//! Game constants and the transition function

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{
    action::{Action, Decision},
    state::GameState,
};

/// Constants that define one variant of the duel.
///
/// Rules are hashable so they can key the reachability cache: two runs with
/// equal rules share one reachable-state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Starting and maximum HP for both sides
    pub max_hp: u32,
    /// Maximum charge a side can hold
    pub max_charge: u32,
    /// Turn at which the game ends by HP comparison
    pub max_turns: u32,
    /// Damage per unit of spent charge
    pub base_damage: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_hp: 30,
            max_charge: 3,
            max_turns: 20,
            base_damage: 6,
        }
    }
}

/// How a finished game went, from the learner's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Extrinsic reward for the learner.
    pub fn reward(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Loss => -1.0,
            Outcome::Draw => 0.0,
        }
    }
}

/// Result of resolving one simultaneous turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub next: GameState,
    pub reward: f64,
    pub done: bool,
    /// Set exactly when `done` is true
    pub outcome: Option<Outcome>,
    /// Damage the learner dealt this turn
    pub damage_dealt: u32,
    /// Damage the learner received this turn
    pub damage_taken: u32,
}

impl GameRules {
    /// State every episode starts from: full HP, no charge, turn zero.
    pub fn initial_state(&self) -> GameState {
        GameState::new(self.max_hp, 0, self.max_hp, 0, 0)
    }

    /// Clamp a requested spend into `[1, charge]` (1 when the side has no charge).
    pub fn clamp_spend(&self, charge: u32, spend: i64) -> u32 {
        let ceiling = i64::from(charge.max(1));
        spend.clamp(1, ceiling) as u32
    }

    /// Damage an attacker with `attacker_charge` deals for a given spend.
    ///
    /// Zero without charge; halved rounding up against a defending target.
    pub fn attack_damage(&self, attacker_charge: u32, spend: i64, defender_action: Action) -> u32 {
        if attacker_charge == 0 {
            return 0;
        }
        let spend = self.clamp_spend(attacker_charge, spend);
        let raw = self.base_damage.saturating_mul(spend);
        if defender_action == Action::Defend {
            raw.div_ceil(2)
        } else {
            raw
        }
    }

    fn next_charge(&self, charge: u32, action: Action) -> u32 {
        match action {
            Action::Attack => charge.saturating_sub(1),
            Action::Charge => (charge + 1).min(self.max_charge),
            Action::Defend => charge,
        }
    }

    /// Whether `state` ends the game, and how.
    ///
    /// KOs are checked before the turn limit; a double KO is a draw.
    pub fn outcome(&self, state: &GameState) -> Option<Outcome> {
        let player_down = state.player_hp == 0;
        let enemy_down = state.enemy_hp == 0;
        match (player_down, enemy_down) {
            (true, true) => Some(Outcome::Draw),
            (false, true) => Some(Outcome::Win),
            (true, false) => Some(Outcome::Loss),
            (false, false) if state.turn >= self.max_turns => Some(self.judge(state)),
            (false, false) => None,
        }
    }

    /// Decide a game by remaining HP: higher HP wins, equal HP draws.
    pub fn judge(&self, state: &GameState) -> Outcome {
        match state.player_hp.cmp(&state.enemy_hp) {
            Ordering::Greater => Outcome::Win,
            Ordering::Less => Outcome::Loss,
            Ordering::Equal => Outcome::Draw,
        }
    }

    /// Resolve one turn in which both sides act simultaneously.
    ///
    /// Every effect is computed from the pre-transition state, so neither side's
    /// action depends on the other's result. Out-of-range spends and state
    /// fields are clamped; this function cannot fail.
    pub fn transition(
        &self,
        state: &GameState,
        learner_action: Action,
        learner_spend: i64,
        opponent_action: Action,
        opponent_spend: i64,
    ) -> Transition {
        let state = state.clamped(self);

        let damage_dealt = if learner_action == Action::Attack {
            self.attack_damage(state.player_charge, learner_spend, opponent_action)
        } else {
            0
        };
        let damage_taken = if opponent_action == Action::Attack {
            self.attack_damage(state.enemy_charge, opponent_spend, learner_action)
        } else {
            0
        };

        let next = GameState {
            player_hp: state.player_hp.saturating_sub(damage_taken),
            player_charge: self.next_charge(state.player_charge, learner_action),
            enemy_hp: state.enemy_hp.saturating_sub(damage_dealt),
            enemy_charge: self.next_charge(state.enemy_charge, opponent_action),
            turn: state.turn.saturating_add(1),
        };

        let outcome = self.outcome(&next);
        Transition {
            next,
            reward: outcome.map_or(0.0, Outcome::reward),
            done: outcome.is_some(),
            outcome,
            damage_dealt,
            damage_taken,
        }
    }

    /// Resolve a turn from two [`Decision`]s.
    pub fn step(&self, state: &GameState, learner: Decision, opponent: Decision) -> Transition {
        self.transition(
            state,
            learner.action,
            i64::from(learner.spend),
            opponent.action,
            i64::from(opponent.spend),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> GameRules {
        GameRules::default()
    }

    #[test]
    fn test_attack_without_charge_deals_no_damage() {
        let rules = rules();
        let start = GameState::new(30, 0, 30, 0, 0);
        let t = rules.transition(&start, Action::Attack, 1, Action::Charge, 1);
        assert_eq!(t.damage_dealt, 0);
        assert_eq!(t.next.enemy_hp, 30);
        assert_eq!(t.next.player_charge, 0);
        assert_eq!(t.next.enemy_charge, 1);
        assert!(!t.done);
    }

    #[test]
    fn test_defend_halves_damage_rounding_up() {
        let rules = rules();
        let state = GameState::new(30, 1, 30, 0, 0);
        let t = rules.transition(&state, Action::Attack, 1, Action::Defend, 1);
        assert_eq!(t.damage_dealt, 3);
        assert_eq!(t.next.enemy_hp, 27);

        let odd = GameRules {
            base_damage: 5,
            ..rules
        };
        let t = odd.transition(&state, Action::Attack, 1, Action::Defend, 1);
        assert_eq!(t.damage_dealt, 3);
    }

    #[test]
    fn test_spend_scales_damage_but_costs_one_charge() {
        let rules = rules();
        let state = GameState::new(30, 3, 30, 0, 0);
        let t = rules.transition(&state, Action::Attack, 3, Action::Charge, 1);
        assert_eq!(t.damage_dealt, 18);
        assert_eq!(t.next.player_charge, 2);

        let t = rules.transition(&state, Action::Attack, 2, Action::Charge, 1);
        assert_eq!(t.damage_dealt, 12);
        assert_eq!(t.next.player_charge, 2);
    }

    #[test]
    fn test_spend_is_clamped_not_rejected() {
        let rules = rules();
        let state = GameState::new(30, 2, 30, 0, 0);
        let high = rules.transition(&state, Action::Attack, 99, Action::Charge, 1);
        assert_eq!(high.damage_dealt, 12);
        let low = rules.transition(&state, Action::Attack, -4, Action::Charge, 1);
        assert_eq!(low.damage_dealt, 6);
    }

    #[test]
    fn test_charge_clamped_at_maximum() {
        let rules = rules();
        let state = GameState::new(30, 3, 30, 3, 0);
        let t = rules.transition(&state, Action::Charge, 1, Action::Charge, 1);
        assert_eq!(t.next.player_charge, 3);
        assert_eq!(t.next.enemy_charge, 3);
    }

    #[test]
    fn test_simultaneous_resolution_uses_pre_state() {
        let rules = rules();
        // Both attack with one charge; both hit even though each loses charge.
        let state = GameState::new(30, 1, 30, 1, 0);
        let t = rules.transition(&state, Action::Attack, 1, Action::Attack, 1);
        assert_eq!(t.damage_dealt, 6);
        assert_eq!(t.damage_taken, 6);
        assert_eq!(t.next.player_charge, 0);
        assert_eq!(t.next.enemy_charge, 0);
    }

    #[test]
    fn test_double_ko_is_draw() {
        let rules = rules();
        let state = GameState::new(6, 1, 6, 1, 3);
        let t = rules.transition(&state, Action::Attack, 1, Action::Attack, 1);
        assert!(t.done);
        assert_eq!(t.reward, 0.0);
        assert_eq!(t.outcome, Some(Outcome::Draw));
        assert_eq!(t.next.player_hp, 0);
        assert_eq!(t.next.enemy_hp, 0);
    }

    #[test]
    fn test_ko_win_and_loss() {
        let rules = rules();
        let state = GameState::new(30, 2, 10, 0, 4);
        let t = rules.transition(&state, Action::Attack, 2, Action::Charge, 1);
        assert_eq!(t.outcome, Some(Outcome::Win));
        assert_eq!(t.reward, 1.0);

        let state = GameState::new(4, 0, 30, 1, 4);
        let t = rules.transition(&state, Action::Charge, 1, Action::Attack, 1);
        assert_eq!(t.outcome, Some(Outcome::Loss));
        assert_eq!(t.reward, -1.0);
    }

    #[test]
    fn test_turn_limit_tie_break_by_hp() {
        let rules = rules();
        let state = GameState::new(10, 0, 4, 0, rules.max_turns - 1);
        let t = rules.transition(&state, Action::Defend, 1, Action::Defend, 1);
        assert_eq!(t.next.turn, rules.max_turns);
        assert!(t.done);
        assert_eq!(t.reward, 1.0);

        let even = GameState::new(7, 0, 7, 0, rules.max_turns - 1);
        let t = rules.transition(&even, Action::Defend, 1, Action::Defend, 1);
        assert!(t.done);
        assert_eq!(t.outcome, Some(Outcome::Draw));
    }

    #[test]
    fn test_turn_always_advances_by_one() {
        let rules = rules();
        let state = GameState::new(30, 1, 30, 1, 5);
        for learner in Action::ALL {
            for opponent in Action::ALL {
                let t = rules.transition(&state, learner, 1, opponent, 1);
                assert_eq!(t.next.turn, 6);
            }
        }
    }

    #[test]
    fn test_outcome_only_on_terminal_states() {
        let rules = rules();
        assert_eq!(rules.outcome(&rules.initial_state()), None);
        assert_eq!(
            rules.outcome(&GameState::new(1, 0, 1, 0, rules.max_turns - 1)),
            None
        );
    }
}

//! Greedy policy evaluation and early stopping
//!
//! Evaluation plays the learner greedily (epsilon −1) against each opponent
//! in the bank. It only borrows the table immutably, so it cannot disturb the
//! values being learned; unseen states fall back to the learner's heuristic
//! instead of creating rows.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::opponents::{DecisionContext, OpponentPolicy};
use crate::{
    game::{Decision, GameRules, Outcome},
    q_learning::{QLearningAgent, QTable},
};

/// Greedy-play statistics against one opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentEvaluation {
    pub opponent: OpponentPolicy,
    pub episodes: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub loss_rate: f64,
    /// Mean number of turns per episode
    pub avg_length: f64,
    pub avg_reward: f64,
}

impl OpponentEvaluation {
    fn new(opponent: OpponentPolicy, episodes: &[EvaluatedEpisode]) -> Self {
        let count = |outcome: Outcome| episodes.iter().filter(|e| e.outcome == outcome).count();
        let wins = count(Outcome::Win);
        let draws = count(Outcome::Draw);
        let losses = count(Outcome::Loss);
        let n = episodes.len();
        let rate = |k: usize| if n > 0 { k as f64 / n as f64 } else { 0.0 };
        let mean = |total: f64| if n > 0 { total / n as f64 } else { 0.0 };

        Self {
            opponent,
            episodes: n,
            wins,
            draws,
            losses,
            win_rate: rate(wins),
            draw_rate: rate(draws),
            loss_rate: rate(losses),
            avg_length: mean(episodes.iter().map(|e| e.steps as f64).sum()),
            avg_reward: mean(episodes.iter().map(|e| e.reward).sum()),
        }
    }
}

/// Evaluation of the current policy against every configured opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Training episode after which the evaluation ran
    pub episode: usize,
    pub results: Vec<OpponentEvaluation>,
}

impl EvaluationReport {
    /// Unweighted mean win rate across opponents
    pub fn mean_win_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.results.iter().map(|r| r.win_rate).sum::<f64>() / self.results.len() as f64
    }

    pub fn result_for(&self, opponent: OpponentPolicy) -> Option<&OpponentEvaluation> {
        self.results.iter().find(|r| r.opponent == opponent)
    }
}

/// One greedy episode's result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatedEpisode {
    pub outcome: Outcome,
    pub steps: usize,
    pub reward: f64,
}

/// Play one episode with the learner acting greedily on `table`
pub fn play_greedy_episode(
    table: &QTable,
    rules: &GameRules,
    opponent: OpponentPolicy,
    rng: &mut StdRng,
) -> EvaluatedEpisode {
    let max_steps = rules.max_turns as usize + 1;
    let mut state = rules.initial_state();
    let mut reward = 0.0;

    for step in 1..=max_steps {
        let action = table
            .greedy_action(&state.key())
            .unwrap_or_else(|| QLearningAgent::fallback_action(&state));
        let learner = Decision::full_charge(action, state.player_charge);
        let ctx = DecisionContext::new(state, rules).with_learner_table(table);
        let opponent_decision = opponent.decide(&ctx, rng);

        let t = rules.step(&state, learner, opponent_decision);
        reward += t.reward;
        state = t.next;
        if let Some(outcome) = t.outcome {
            return EvaluatedEpisode {
                outcome,
                steps: step,
                reward,
            };
        }
    }

    EvaluatedEpisode {
        outcome: rules.judge(&state),
        steps: max_steps,
        reward,
    }
}

/// Evaluate the greedy policy on `table` against each opponent
pub fn evaluate(
    table: &QTable,
    rules: &GameRules,
    opponents: &[OpponentPolicy],
    episodes: usize,
    after_episode: usize,
    rng: &mut StdRng,
) -> EvaluationReport {
    let results = opponents
        .iter()
        .map(|&opponent| {
            let played: Vec<EvaluatedEpisode> = (0..episodes)
                .map(|_| play_greedy_episode(table, rules, opponent, rng))
                .collect();
            OpponentEvaluation::new(opponent, &played)
        })
        .collect();

    EvaluationReport {
        episode: after_episode,
        results,
    }
}

/// Halts training once evaluation win rates stop moving
///
/// Keeps the last `window` mean win rates; when the window is full and the
/// spread between its largest and smallest value is below `delta`, training
/// is considered converged.
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    window: usize,
    delta: f64,
    history: VecDeque<f64>,
}

impl EarlyStopping {
    pub fn new(window: usize, delta: f64) -> Self {
        Self {
            window,
            delta,
            history: VecDeque::with_capacity(window),
        }
    }

    /// Record one evaluation; returns true when training should stop
    pub fn record(&mut self, win_rate: f64) -> bool {
        if self.window == 0 {
            return false;
        }
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(win_rate);
        self.converged()
    }

    pub fn converged(&self) -> bool {
        if self.window == 0 || self.history.len() < self.window {
            return false;
        }
        let max = self.history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = self.history.iter().copied().fold(f64::INFINITY, f64::min);
        max - min < self.delta
    }

    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }
}

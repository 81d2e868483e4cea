//! Opponent policy bank
//!
//! The set of opponent archetypes is fixed and small, so policies are a closed
//! enum dispatched by `match`. Every policy plays from the enemy side of the
//! [`GameState`]: its own charge is `enemy_charge`, the learner's is
//! `player_charge`.

use std::{fmt, str::FromStr};

use rand::{Rng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    game::{Action, Decision, GameRules, GameState},
    q_learning::QTable,
};

/// Everything a policy may look at when choosing a move
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub state: GameState,
    pub rules: &'a GameRules,
    /// Learner's table, read-only; used by [`OpponentPolicy::Mirror`] and
    /// [`OpponentPolicy::BestResponse`]
    pub learner_table: Option<&'a QTable>,
    /// Probability that a table-driven policy plays a random action instead
    pub epsilon: Option<f64>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(state: GameState, rules: &'a GameRules) -> Self {
        Self {
            state,
            rules,
            learner_table: None,
            epsilon: None,
        }
    }

    pub fn with_learner_table(mut self, table: &'a QTable) -> Self {
        self.learner_table = Some(table);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }
}

/// Opponent archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentPolicy {
    /// Uniformly random actions
    Random,
    /// Attacks whenever it holds charge
    Aggressive,
    /// Guards against a better-charged learner, otherwise builds charge
    Defensive,
    /// Plays the learner's own greedy action
    Mirror,
    /// Punishes the learner's predicted greedy action
    BestResponse,
}

impl OpponentPolicy {
    /// Every policy in the bank, in curriculum order
    pub const ALL: [OpponentPolicy; 5] = [
        OpponentPolicy::Random,
        OpponentPolicy::Aggressive,
        OpponentPolicy::Defensive,
        OpponentPolicy::Mirror,
        OpponentPolicy::BestResponse,
    ];

    /// Get short label
    pub fn label(&self) -> &'static str {
        match self {
            OpponentPolicy::Random => "random",
            OpponentPolicy::Aggressive => "aggressive",
            OpponentPolicy::Defensive => "defensive",
            OpponentPolicy::Mirror => "mirror",
            OpponentPolicy::BestResponse => "best-response",
        }
    }

    /// Choose the opponent's action and spend for the current state
    pub fn decide(&self, ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Decision {
        let own_charge = ctx.state.enemy_charge;
        let action = match self {
            OpponentPolicy::Random => random_action(rng),
            OpponentPolicy::Aggressive => aggressive(own_charge),
            OpponentPolicy::Defensive => defensive(ctx, rng),
            OpponentPolicy::Mirror => {
                explore(ctx, rng).unwrap_or_else(|| predicted_learner_action(ctx))
            }
            OpponentPolicy::BestResponse => {
                explore(ctx, rng).unwrap_or_else(|| best_response(ctx))
            }
        };
        Decision::full_charge(action, own_charge)
    }
}

impl fmt::Display for OpponentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OpponentPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(OpponentPolicy::Random),
            "aggressive" => Ok(OpponentPolicy::Aggressive),
            "defensive" => Ok(OpponentPolicy::Defensive),
            "mirror" => Ok(OpponentPolicy::Mirror),
            "best-response" | "best_response" | "bestresponse" => {
                Ok(OpponentPolicy::BestResponse)
            }
            _ => Err(Error::ParseOpponent {
                input: s.to_string(),
                expected: OpponentPolicy::ALL
                    .iter()
                    .map(OpponentPolicy::label)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

fn random_action(rng: &mut StdRng) -> Action {
    *Action::ALL.choose(rng).unwrap_or(&Action::Charge)
}

fn aggressive(own_charge: u32) -> Action {
    if own_charge >= 1 {
        Action::Attack
    } else {
        Action::Charge
    }
}

fn defensive(ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Action {
    let own = ctx.state.enemy_charge;
    let learner = ctx.state.player_charge;
    let heavy = ctx.rules.max_charge.saturating_sub(1).max(2);

    if learner > 0 && own < learner {
        Action::Defend
    } else if own >= heavy && rng.random_bool(0.5) {
        Action::Attack
    } else {
        Action::Charge
    }
}

/// Random action with probability epsilon, if one is configured
fn explore(ctx: &DecisionContext<'_>, rng: &mut StdRng) -> Option<Action> {
    match ctx.epsilon {
        Some(epsilon) if epsilon > 0.0 && rng.random::<f64>() < epsilon => {
            Some(random_action(rng))
        }
        _ => None,
    }
}

/// Learner's greedy action at the current state, or CHARGE if unseen
fn predicted_learner_action(ctx: &DecisionContext<'_>) -> Action {
    ctx.learner_table
        .and_then(|table| table.greedy_action(&ctx.state.key()))
        .unwrap_or(Action::Charge)
}

fn best_response(ctx: &DecisionContext<'_>) -> Action {
    let Some(predicted) = ctx
        .learner_table
        .and_then(|table| table.greedy_action(&ctx.state.key()))
    else {
        return Action::Charge;
    };

    let learner_spend = i64::from(ctx.state.player_charge.max(1));
    let own_spend = i64::from(ctx.state.enemy_charge.max(1));

    // Lower learner reward first, then the larger HP swing toward us.
    let score = |action: Action| {
        let t = ctx
            .rules
            .transition(&ctx.state, predicted, learner_spend, action, own_spend);
        let swing = i64::from(t.next.player_hp) - i64::from(t.next.enemy_hp);
        (t.reward, swing)
    };

    let mut best = Action::ALL[0];
    let mut best_score = score(best);
    for &action in &Action::ALL[1..] {
        let candidate = score(action);
        if candidate < best_score {
            best = action;
            best_score = candidate;
        }
    }
    best
}

//! Per-step and per-episode training records

use serde::{Deserialize, Serialize};

use super::opponents::OpponentPolicy;
use crate::game::{Decision, GameState, Outcome};

/// One resolved turn of a training episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step number within the episode (0-based)
    pub step: usize,
    pub state: GameState,
    pub learner: Decision,
    pub opponent: Decision,
    pub next: GameState,
    /// Extrinsic reward from the transition
    pub reward: f64,
    /// Intrinsic exploration bonus added to the update target
    pub bonus: f64,
    /// Learning rate used for the update
    pub alpha: f64,
    pub td_error: f64,
    pub done: bool,
}

/// Summary of one finished training episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Episode index (0-based)
    pub episode: usize,
    pub opponent: OpponentPolicy,
    pub outcome: Outcome,
    pub steps: usize,
    /// Sum of extrinsic rewards
    pub reward: f64,
    /// Sum of intrinsic bonuses
    pub bonus: f64,
    pub epsilon: f64,
    /// Coverage after the episode, in percent
    pub coverage_pct: f64,
    /// Reachable states first entered during this episode
    pub discovered: usize,
}

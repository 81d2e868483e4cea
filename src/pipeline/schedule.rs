//! Exploration and learning-rate schedules
//!
//! All schedules are functions of training progress `p = episode / total`
//! in `[0, 1]`, plus per-state visit counts where noted.
//!
//! - **Epsilon**: `floor + (start − floor) · exp(−k · p)` with
//!   `k = ln(1000) / decay_until`, so the excess over the floor has shrunk by
//!   a factor of 1000 at `p = decay_until`. Two overrides raise it again:
//!   low coverage holds it near its starting value, and a run of episodes
//!   without discovering a new reachable state boosts it.
//! - **Alpha**: geometric interpolation `start · (end / start)^p`, optionally
//!   scaled down per state as `1 / (1 + visits / visit_scale)`.
//! - **Intrinsic bonus**: `coeff · (1 − visits / threshold)` for rarely
//!   visited next-states.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Epsilon-greedy exploration settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Epsilon at progress 0
    pub epsilon_start: f64,
    /// Hard lower bound for epsilon
    pub epsilon_end: f64,
    /// Progress at which the decay has effectively reached the floor
    pub decay_until: f64,
    /// Coverage fraction below which epsilon is held high (0 disables)
    pub coverage_threshold: f64,
    /// Share of `epsilon_start` kept while coverage is below the threshold
    pub coverage_hold: f64,
    /// Episodes without a new reachable state before epsilon is boosted (0 disables)
    pub stagnation_episodes: usize,
    /// Epsilon used while stagnating
    pub stagnation_epsilon: f64,
    /// Intrinsic bonus for a never-visited next-state (0 disables)
    pub bonus_coefficient: f64,
    /// Visit count at which the bonus reaches zero
    pub bonus_visit_threshold: u64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            epsilon_start: 1.0,
            epsilon_end: 0.05,
            decay_until: 0.8,
            coverage_threshold: 0.9,
            coverage_hold: 0.95,
            stagnation_episodes: 500,
            stagnation_epsilon: 0.5,
            bonus_coefficient: 0.05,
            bonus_visit_threshold: 5,
        }
    }
}

/// Learning-rate settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningRateConfig {
    pub alpha_start: f64,
    pub alpha_end: f64,
    /// Scale alpha down for frequently visited states
    pub adaptive: bool,
    /// Visits at which the adaptive factor halves alpha
    pub visit_scale: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
}

impl Default for LearningRateConfig {
    fn default() -> Self {
        Self {
            alpha_start: 0.5,
            alpha_end: 0.05,
            adaptive: true,
            visit_scale: 50.0,
            alpha_min: 0.01,
            alpha_max: 0.5,
        }
    }
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidConfiguration {
        message: message.into(),
    }
}

impl ExplorationConfig {
    pub fn validate(&self) -> Result<()> {
        if !unit_interval(self.epsilon_start) || !unit_interval(self.epsilon_end) {
            return Err(invalid("epsilon_start and epsilon_end must lie in [0, 1]"));
        }
        if !unit_interval(self.coverage_threshold) || !unit_interval(self.coverage_hold) {
            return Err(invalid("coverage_threshold and coverage_hold must lie in [0, 1]"));
        }
        if !unit_interval(self.stagnation_epsilon) {
            return Err(invalid("stagnation_epsilon must lie in [0, 1]"));
        }
        if !self.decay_until.is_finite() {
            return Err(invalid("decay_until must be finite"));
        }
        if !self.bonus_coefficient.is_finite() || self.bonus_coefficient < 0.0 {
            return Err(invalid("bonus_coefficient must be a non-negative number"));
        }
        Ok(())
    }
}

impl LearningRateConfig {
    pub fn validate(&self) -> Result<()> {
        let rates = [self.alpha_start, self.alpha_end, self.alpha_min, self.alpha_max];
        if rates.iter().any(|&a| !unit_interval(a)) {
            return Err(invalid("learning rates must lie in [0, 1]"));
        }
        if self.alpha_min > self.alpha_max {
            return Err(invalid(format!(
                "alpha_min ({}) exceeds alpha_max ({})",
                self.alpha_min, self.alpha_max
            )));
        }
        if !self.visit_scale.is_finite() {
            return Err(invalid("visit_scale must be finite"));
        }
        Ok(())
    }
}

/// Computes epsilon, alpha and the intrinsic bonus for the training loop
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scheduler {
    exploration: ExplorationConfig,
    learning_rate: LearningRateConfig,
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl Scheduler {
    pub fn new(exploration: ExplorationConfig, learning_rate: LearningRateConfig) -> Self {
        Self {
            exploration,
            learning_rate,
        }
    }

    pub fn exploration(&self) -> &ExplorationConfig {
        &self.exploration
    }

    pub fn learning_rate(&self) -> &LearningRateConfig {
        &self.learning_rate
    }

    /// Decayed epsilon before any override; never below the floor
    pub fn epsilon(&self, progress: f64) -> f64 {
        let cfg = &self.exploration;
        let floor = cfg.epsilon_end;
        if cfg.decay_until <= 0.0 {
            return floor;
        }
        let k = 1000f64.ln() / cfg.decay_until;
        let decayed = floor + (cfg.epsilon_start - floor) * (-k * clamp_progress(progress)).exp();
        decayed.max(floor).min(1.0)
    }

    /// Epsilon for the next episode, including the coverage and stagnation overrides
    pub fn exploration_epsilon(
        &self,
        progress: f64,
        coverage_fraction: f64,
        episodes_since_discovery: usize,
    ) -> f64 {
        let cfg = &self.exploration;
        let mut epsilon = self.epsilon(progress);

        if cfg.coverage_threshold > 0.0 && coverage_fraction < cfg.coverage_threshold {
            epsilon = epsilon.max(cfg.epsilon_start * cfg.coverage_hold);
        }
        if cfg.stagnation_episodes > 0 && episodes_since_discovery >= cfg.stagnation_episodes {
            epsilon = epsilon.max(cfg.stagnation_epsilon);
        }
        epsilon.min(1.0)
    }

    /// Global learning rate at `progress`
    pub fn alpha(&self, progress: f64) -> f64 {
        let cfg = &self.learning_rate;
        let p = clamp_progress(progress);
        if cfg.alpha_start > 0.0 && cfg.alpha_end > 0.0 {
            cfg.alpha_start * (cfg.alpha_end / cfg.alpha_start).powf(p)
        } else {
            cfg.alpha_start + (cfg.alpha_end - cfg.alpha_start) * p
        }
    }

    /// Learning rate for a state that has been visited `visits` times
    pub fn state_alpha(&self, progress: f64, visits: u64) -> f64 {
        let cfg = &self.learning_rate;
        let alpha = self.alpha(progress);
        if !cfg.adaptive {
            return alpha;
        }
        let scaled = if cfg.visit_scale > 0.0 {
            alpha / (1.0 + visits as f64 / cfg.visit_scale)
        } else {
            alpha
        };
        scaled.clamp(cfg.alpha_min, cfg.alpha_max)
    }

    /// Intrinsic reward for entering a state with `visits` prior entries
    pub fn bonus(&self, visits: u64) -> f64 {
        let cfg = &self.exploration;
        if cfg.bonus_coefficient <= 0.0 || visits >= cfg.bonus_visit_threshold {
            return 0.0;
        }
        cfg.bonus_coefficient * (1.0 - visits as f64 / cfg.bonus_visit_threshold as f64)
    }
}

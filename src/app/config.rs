//! Configuration types for the served policy.

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    game::GameRules,
    q_learning::DEFAULT_PRECISION,
};

/// Default upper bound on the length of a submitted episode
pub const DEFAULT_MAX_SUBMISSION_STEPS: usize = 64;

/// Configuration for the policy service that learns from submitted episodes.
///
/// This type provides a type-safe, builder-style API for configuring the
/// service before it is created through the dependency injection container.
///
/// # Examples
///
/// ```
/// use skirmish::app::ServiceConfig;
///
/// let config = ServiceConfig::default()
///     .with_alpha(0.2)
///     .with_gamma(0.9)
///     .with_max_submission_steps(32);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Rules submitted episodes are replayed under
    pub rules: GameRules,
    /// Learning rate for submitted transitions
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Longest accepted submission
    pub max_submission_steps: usize,
    /// Decimals kept when the table is saved
    pub precision: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            alpha: 0.1,
            gamma: 0.95,
            max_submission_steps: DEFAULT_MAX_SUBMISSION_STEPS,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl ServiceConfig {
    /// Set the game rules.
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Set the learning rate.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the longest accepted submission.
    pub fn with_max_submission_steps(mut self, steps: usize) -> Self {
        self.max_submission_steps = steps;
        self
    }

    /// Set the persisted precision.
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) || !(0.0..=1.0).contains(&self.gamma) {
            return Err(Error::InvalidConfiguration {
                message: format!(
                    "alpha ({}) and gamma ({}) must lie in [0, 1]",
                    self.alpha, self.gamma
                ),
            });
        }
        if self.max_submission_steps == 0 {
            return Err(Error::InvalidConfiguration {
                message: "max_submission_steps must be positive".to_string(),
            });
        }
        Ok(())
    }
}

//! Training and evaluation pipeline
//!
//! This module provides the machinery around the Q-learning update:
//! - The opponent bank and the curriculum that samples from it
//! - Exploration and learning-rate schedules
//! - Reachability analysis and coverage tracking
//! - Greedy evaluation and early stopping
//! - The training loop and its observers

pub mod coverage;
pub mod curriculum;
pub mod episode;
pub mod evaluation;
pub mod observers;
pub mod opponents;
pub mod schedule;
pub mod training;

pub use coverage::{CoverageTracker, ReachabilityCache, compute_reachable, coverage_pct};
pub use curriculum::{Curriculum, sample_policy};
pub use episode::{EpisodeSummary, StepRecord};
pub use evaluation::{
    EarlyStopping, EvaluatedEpisode, EvaluationReport, OpponentEvaluation, evaluate,
    play_greedy_episode,
};
// Re-export observer implementations (adapters)
pub use observers::{
    JsonlObserver, MetricsObserver, MetricsSummary, Observation, OutcomeCounts, ProgressObserver,
    SharedObserver,
};
pub use opponents::{DecisionContext, OpponentPolicy};
pub use schedule::{ExplorationConfig, LearningRateConfig, Scheduler};
pub use training::{StopReason, Trainer, TrainingConfig, TrainingReport};

pub use crate::ports::Observer;

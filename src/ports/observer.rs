//! Observer port - abstraction for training observation and data collection
//!
//! This port defines the interface for observing training events,
//! allowing composable data collection without coupling training
//! logic to specific output formats or metrics.

use std::path::Path;

use crate::{
    Result,
    pipeline::{EpisodeSummary, EvaluationReport, StepRecord, TrainingReport},
};

/// Observer trait for monitoring training
///
/// Observers can be composed to collect different types of data during training.
/// Examples include:
/// - Progress bars for user feedback
/// - JSONL export of episode summaries
/// - Metrics tracking for evaluation
///
/// # Design Philosophy
///
/// This trait represents a **port** in hexagonal architecture - a boundary
/// between the training pipeline and external observation mechanisms.
/// Different observation strategies are **adapters** that implement this port.
///
/// # Event Sequence
///
/// The observer methods are called in the following order:
/// 1. `on_training_start(total_episodes)` - Once at the beginning
/// 2. For each episode:
///    - `on_episode_start(episode)`
///    - `on_step(...)` - For each resolved turn, after the Q-update
///    - `on_episode_end(summary)`
///    - `on_evaluation(report)` / `on_checkpoint(...)` - When due
/// 3. `on_training_end(report)` - Once at the end
///
/// # Examples
///
/// ```no_run
/// use skirmish::{pipeline::EpisodeSummary, ports::Observer};
///
/// struct EpisodeCounter {
///     episodes: usize,
/// }
///
/// impl Observer for EpisodeCounter {
///     fn on_episode_end(&mut self, _summary: &EpisodeSummary) -> skirmish::Result<()> {
///         self.episodes += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called when training starts.
    ///
    /// # Parameters
    ///
    /// * `total_episodes` - Number of episodes the run is configured for
    fn on_training_start(&mut self, _total_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called when an episode starts.
    fn on_episode_start(&mut self, _episode: usize) -> Result<()> {
        Ok(())
    }

    /// Called for each turn after the learner's table has been updated.
    fn on_step(&mut self, _episode: usize, _step: &StepRecord) -> Result<()> {
        Ok(())
    }

    /// Called when an episode reaches its terminal transition.
    fn on_episode_end(&mut self, _summary: &EpisodeSummary) -> Result<()> {
        Ok(())
    }

    /// Called after each periodic greedy evaluation.
    fn on_evaluation(&mut self, _report: &EvaluationReport) -> Result<()> {
        Ok(())
    }

    /// Called after a checkpoint was written successfully.
    fn on_checkpoint(&mut self, _episode: usize, _location: &Path) -> Result<()> {
        Ok(())
    }

    /// Called when training completes.
    ///
    /// This is the last method called in the observation lifecycle.
    /// Use this to finalize outputs, close files, or display summaries.
    fn on_training_end(&mut self, _report: &TrainingReport) -> Result<()> {
        Ok(())
    }
}

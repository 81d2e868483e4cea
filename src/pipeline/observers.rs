//! Observer pattern for training pipelines
//!
//! Observers allow composable data collection during training without coupling
//! training logic to specific output formats.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    episode::{EpisodeSummary, StepRecord},
    evaluation::EvaluationReport,
    training::TrainingReport,
};
use crate::{Result, game::Outcome, ports::Observer};

/// Progress bar observer - Shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    wins: usize,
    draws: usize,
    losses: usize,
    coverage_pct: f64,
}

impl ProgressObserver {
    /// Create a new progress observer
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            wins: 0,
            draws: 0,
            losses: 0,
            coverage_pct: 0.0,
        }
    }

    fn message(&self) -> String {
        format!(
            "{} D:{} L:{} cov:{:.1}%",
            self.wins, self.draws, self.losses, self.coverage_pct
        )
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_training_start(&mut self, total_episodes: usize) -> Result<()> {
        let pb = ProgressBar::new(total_episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes (W:{msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        match summary.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.coverage_pct = summary.coverage_pct;

        if let Some(pb) = &self.progress_bar {
            pb.set_position(summary.episode as u64 + 1);
            pb.set_message(self.message());
        }
        Ok(())
    }

    fn on_training_end(&mut self, _report: &TrainingReport) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(self.message());
        }
        Ok(())
    }
}

/// Metrics observer - Tracks training metrics
pub struct MetricsObserver {
    wins: usize,
    draws: usize,
    losses: usize,
    total_episodes: usize,
    episode_lengths: Vec<usize>,
    total_reward: f64,
    total_bonus: f64,
    td_error_sum: f64,
    steps: usize,
    by_opponent: BTreeMap<String, OutcomeCounts>,
}

/// Win/draw/loss tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Loss => self.losses += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.wins + self.draws + self.losses
    }
}

impl MetricsObserver {
    /// Create a new metrics observer
    pub fn new() -> Self {
        Self {
            wins: 0,
            draws: 0,
            losses: 0,
            total_episodes: 0,
            episode_lengths: Vec::new(),
            total_reward: 0.0,
            total_bonus: 0.0,
            td_error_sum: 0.0,
            steps: 0,
            by_opponent: BTreeMap::new(),
        }
    }

    fn rate(&self, count: usize) -> f64 {
        if self.total_episodes == 0 {
            0.0
        } else {
            count as f64 / self.total_episodes as f64
        }
    }

    /// Get current win rate
    pub fn win_rate(&self) -> f64 {
        self.rate(self.wins)
    }

    /// Get current draw rate
    pub fn draw_rate(&self) -> f64 {
        self.rate(self.draws)
    }

    /// Get current loss rate
    pub fn loss_rate(&self) -> f64 {
        self.rate(self.losses)
    }

    /// Get average episode length
    pub fn avg_episode_length(&self) -> f64 {
        if self.episode_lengths.is_empty() {
            0.0
        } else {
            self.episode_lengths.iter().sum::<usize>() as f64 / self.episode_lengths.len() as f64
        }
    }

    /// Get metrics summary
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_episodes: self.total_episodes,
            wins: self.wins,
            draws: self.draws,
            losses: self.losses,
            win_rate: self.win_rate(),
            draw_rate: self.draw_rate(),
            loss_rate: self.loss_rate(),
            avg_episode_length: self.avg_episode_length(),
            avg_reward: self.rate_f64(self.total_reward),
            avg_bonus: self.rate_f64(self.total_bonus),
            mean_abs_td_error: if self.steps == 0 {
                0.0
            } else {
                self.td_error_sum / self.steps as f64
            },
            by_opponent: self.by_opponent.clone(),
        }
    }

    fn rate_f64(&self, total: f64) -> f64 {
        if self.total_episodes == 0 {
            0.0
        } else {
            total / self.total_episodes as f64
        }
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_episodes: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub loss_rate: f64,
    pub avg_episode_length: f64,
    pub avg_reward: f64,
    pub avg_bonus: f64,
    pub mean_abs_td_error: f64,
    /// Outcome tallies keyed by opponent label
    pub by_opponent: BTreeMap<String, OutcomeCounts>,
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for MetricsObserver {
    fn on_step(&mut self, _episode: usize, step: &StepRecord) -> Result<()> {
        self.steps += 1;
        self.td_error_sum += step.td_error.abs();
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.total_episodes += 1;
        match summary.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.episode_lengths.push(summary.steps);
        self.total_reward += summary.reward;
        self.total_bonus += summary.bonus;
        self.by_opponent
            .entry(summary.opponent.label().to_string())
            .or_default()
            .record(summary.outcome);
        Ok(())
    }
}

/// Observer shared with the caller, so its data can be read after the
/// trainer that owns the boxed observer is done with it
pub struct SharedObserver<O> {
    inner: Arc<Mutex<O>>,
}

impl<O: Observer> SharedObserver<O> {
    pub fn new(inner: Arc<Mutex<O>>) -> Self {
        Self { inner }
    }
}

impl<O: Observer> Observer for SharedObserver<O> {
    fn on_training_start(&mut self, total_episodes: usize) -> Result<()> {
        self.inner.lock().on_training_start(total_episodes)
    }

    fn on_episode_start(&mut self, episode: usize) -> Result<()> {
        self.inner.lock().on_episode_start(episode)
    }

    fn on_step(&mut self, episode: usize, step: &StepRecord) -> Result<()> {
        self.inner.lock().on_step(episode, step)
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.inner.lock().on_episode_end(summary)
    }

    fn on_evaluation(&mut self, report: &EvaluationReport) -> Result<()> {
        self.inner.lock().on_evaluation(report)
    }

    fn on_checkpoint(&mut self, episode: usize, location: &Path) -> Result<()> {
        self.inner.lock().on_checkpoint(episode, location)
    }

    fn on_training_end(&mut self, report: &TrainingReport) -> Result<()> {
        self.inner.lock().on_training_end(report)
    }
}

/// Complete observation of a training episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    #[serde(flatten)]
    pub summary: EpisodeSummary,
    /// Turns of the episode, present when step recording is enabled
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turns: Vec<StepRecord>,
}

/// JSONL observer - Exports observations to JSON Lines format
pub struct JsonlObserver {
    writer: BufWriter<File>,
    record_steps: bool,
    current_steps: Vec<StepRecord>,
}

impl JsonlObserver {
    /// Create a new JSONL observer writing one line per episode
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            record_steps: false,
            current_steps: Vec::new(),
        })
    }

    /// Include every turn of each episode in its line
    pub fn with_steps(mut self) -> Self {
        self.record_steps = true;
        self
    }
}

impl Observer for JsonlObserver {
    fn on_episode_start(&mut self, _episode: usize) -> Result<()> {
        self.current_steps.clear();
        Ok(())
    }

    fn on_step(&mut self, _episode: usize, step: &StepRecord) -> Result<()> {
        if self.record_steps {
            self.current_steps.push(*step);
        }
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary) -> Result<()> {
        let observation = Observation {
            summary: *summary,
            turns: std::mem::take(&mut self.current_steps),
        };

        // Write as JSONL (one JSON object per line)
        serde_json::to_writer(&mut self.writer, &observation)?;
        writeln!(&mut self.writer)?;
        Ok(())
    }

    fn on_training_end(&mut self, _report: &TrainingReport) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader};

    use super::*;
    use crate::{
        game::{Action, Decision, GameState},
        pipeline::OpponentPolicy,
    };

    fn summary(episode: usize, opponent: OpponentPolicy, outcome: Outcome) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            opponent,
            outcome,
            steps: 2,
            reward: outcome.reward(),
            bonus: 0.1,
            epsilon: 0.5,
            coverage_pct: 1.0,
            discovered: 2,
        }
    }

    fn step(step: usize, td_error: f64) -> StepRecord {
        let state = GameState::new(30, 0, 30, 0, step as u32);
        StepRecord {
            step,
            state,
            learner: Decision::new(Action::Charge, 0),
            opponent: Decision::new(Action::Charge, 0),
            next: GameState::new(30, 1, 30, 1, step as u32 + 1),
            reward: 0.0,
            bonus: 0.05,
            alpha: 0.5,
            td_error,
            done: false,
        }
    }

    fn play(observer: &mut dyn Observer, episode: usize, opponent: OpponentPolicy, outcome: Outcome) {
        observer.on_episode_start(episode).unwrap();
        observer.on_step(episode, &step(0, 0.5)).unwrap();
        observer.on_step(episode, &step(1, -1.5)).unwrap();
        observer
            .on_episode_end(&summary(episode, opponent, outcome))
            .unwrap();
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        let file = File::open(path).unwrap();
        BufReader::new(file)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_metrics_observer() {
        let mut observer = MetricsObserver::new();
        assert_eq!(observer.win_rate(), 0.0);

        play(&mut observer, 0, OpponentPolicy::Random, Outcome::Win);
        play(&mut observer, 1, OpponentPolicy::Random, Outcome::Draw);
        play(&mut observer, 2, OpponentPolicy::Aggressive, Outcome::Loss);

        let metrics = observer.summary();
        assert_eq!(metrics.total_episodes, 3);
        assert_eq!((metrics.wins, metrics.draws, metrics.losses), (1, 1, 1));
        assert!((metrics.win_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.avg_episode_length, 2.0);
        assert!((metrics.mean_abs_td_error - 1.0).abs() < 1e-9);

        let random = metrics.by_opponent["random"];
        assert_eq!((random.wins, random.draws, random.losses), (1, 1, 0));
        assert_eq!(metrics.by_opponent["aggressive"].losses, 1);
        assert_eq!(metrics.by_opponent.len(), 2);
    }

    #[test]
    fn test_shared_observer_exposes_data() {
        let metrics = Arc::new(Mutex::new(MetricsObserver::new()));
        let mut shared = SharedObserver::new(Arc::clone(&metrics));
        play(&mut shared, 0, OpponentPolicy::Mirror, Outcome::Win);
        assert_eq!(metrics.lock().summary().wins, 1);
    }

    #[test]
    fn test_jsonl_observer_writes_one_line_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.jsonl");
        {
            let mut observer = JsonlObserver::new(&path).unwrap();
            play(&mut observer, 0, OpponentPolicy::Random, Outcome::Win);
            play(&mut observer, 1, OpponentPolicy::Defensive, Outcome::Loss);
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["episode"], 0);
        assert_eq!(lines[0]["opponent"], "random");
        assert_eq!(lines[1]["outcome"], "Loss");
        assert_eq!(lines[0]["steps"], 2);
        assert!(lines[0].get("turns").is_none());
    }

    #[test]
    fn test_jsonl_observer_records_turns_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turns.jsonl");
        {
            let mut observer = JsonlObserver::new(&path).unwrap().with_steps();
            play(&mut observer, 0, OpponentPolicy::Random, Outcome::Win);
            play(&mut observer, 1, OpponentPolicy::Random, Outcome::Draw);
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let turns = line["turns"].as_array().unwrap();
            assert_eq!(turns.len(), 2);
            assert_eq!(turns[1]["td_error"], -1.5);
        }
    }
}

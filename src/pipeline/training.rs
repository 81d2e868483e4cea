//! Training pipeline for the Q-learning agent
//!
//! One [`Trainer`] drives a single run: each episode samples an opponent from
//! the curriculum, plays from the initial state until the game ends, and
//! applies one temporal-difference update per turn. Evaluation, checkpoints,
//! pruning and early stopping run on their own episode intervals.

use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{
    coverage::CoverageTracker,
    curriculum::Curriculum,
    episode::{EpisodeSummary, StepRecord},
    evaluation::{EarlyStopping, EvaluationReport, evaluate},
    observers::OutcomeCounts,
    opponents::{DecisionContext, OpponentPolicy},
    schedule::{ExplorationConfig, LearningRateConfig, Scheduler},
};
use crate::{
    Error, Result,
    game::GameRules,
    identifiers::StateKey,
    ports::{Observer, TableRepository},
    q_learning::{DEFAULT_PRECISION, PersistedTable, QLearningAgent, TableMeta, build_rng},
};

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training episodes
    pub episodes: usize,

    /// Random seed
    pub seed: Option<u64>,

    pub rules: GameRules,

    /// Discount factor
    pub gamma: f64,

    pub exploration: ExplorationConfig,

    pub learning_rate: LearningRateConfig,

    /// Opponents the curriculum samples from
    pub opponents: Vec<OpponentPolicy>,

    /// Chance that table-driven opponents play a random move during training
    pub opponent_epsilon: f64,

    /// Episodes between progress log lines (0 disables)
    pub log_interval: usize,

    /// Episodes between greedy evaluations (0 disables)
    pub eval_interval: usize,

    /// Episodes per opponent in each evaluation
    pub eval_episodes: usize,

    /// Episodes between checkpoints (0 disables)
    pub checkpoint_interval: usize,

    /// Checkpoint locations are `{prefix}-{episode:08}-{timestamp}`
    pub checkpoint_prefix: String,

    /// Episodes between pruning passes (0 disables)
    pub prune_interval: usize,

    pub prune_min_visits: u64,

    pub prune_max_abs: f64,

    /// Number of evaluations the convergence window spans (0 disables)
    pub early_stop_window: usize,

    /// Maximum spread of mean win rates inside a converged window
    pub early_stop_delta: f64,

    /// Where the final table is saved
    pub output: Option<PathBuf>,

    /// Table to continue training from
    pub resume: Option<PathBuf>,

    /// Decimals kept for persisted Q-values
    pub precision: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 20_000,
            seed: None,
            rules: GameRules::default(),
            gamma: 0.95,
            exploration: ExplorationConfig::default(),
            learning_rate: LearningRateConfig::default(),
            opponents: OpponentPolicy::ALL.to_vec(),
            opponent_epsilon: 0.1,
            log_interval: 1_000,
            eval_interval: 2_000,
            eval_episodes: 100,
            checkpoint_interval: 0,
            checkpoint_prefix: "checkpoints/qtable".to_string(),
            prune_interval: 0,
            prune_min_visits: 1,
            prune_max_abs: 0.01,
            early_stop_window: 5,
            early_stop_delta: 0.01,
            output: None,
            resume: None,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl TrainingConfig {
    /// Reject settings the training loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidConfiguration { message });

        if self.episodes == 0 {
            return invalid("episodes must be greater than zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid(format!("gamma must lie in [0, 1], got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.opponent_epsilon) {
            return invalid(format!(
                "opponent_epsilon must lie in [0, 1], got {}",
                self.opponent_epsilon
            ));
        }
        let rules = &self.rules;
        if rules.max_hp == 0 || rules.max_charge == 0 || rules.max_turns == 0 {
            return invalid("max_hp, max_charge and max_turns must be positive".to_string());
        }
        if self.eval_interval > 0 && self.eval_episodes == 0 {
            return invalid("eval_episodes must be positive when evaluation is enabled".into());
        }
        if !self.prune_max_abs.is_finite() || self.prune_max_abs < 0.0 {
            return invalid("prune_max_abs must be a non-negative number".to_string());
        }
        if !self.early_stop_delta.is_finite() || self.early_stop_delta < 0.0 {
            return invalid("early_stop_delta must be a non-negative number".to_string());
        }
        self.exploration.validate()?;
        self.learning_rate.validate()
    }

    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Io {
            operation: format!("open training config {}", path.display()),
            source,
        })?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// All configured episodes were played
    Completed,
    /// Evaluation win rates stopped moving
    Converged { episode: usize },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => f.write_str("completed"),
            StopReason::Converged { episode } => write!(f, "converged at episode {episode}"),
        }
    }
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes_run: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub draw_rate: f64,
    pub loss_rate: f64,
    pub avg_reward: f64,
    pub avg_length: f64,
    pub coverage_pct: f64,
    pub reachable_states: usize,
    pub visited_states: usize,
    pub table_size: usize,
    pub pruned_rows: usize,
    pub version: u64,
    pub stop_reason: StopReason,
    pub checkpoints: Vec<PathBuf>,
    pub evaluations: Vec<EvaluationReport>,
}

impl TrainingReport {
    /// Latest evaluation, if any ran
    pub fn last_evaluation(&self) -> Option<&EvaluationReport> {
        self.evaluations.last()
    }
}

/// Running totals for the whole run and for the current log interval
#[derive(Debug, Default)]
struct Tally {
    outcomes: OutcomeCounts,
    reward: f64,
    steps: usize,
}

impl Tally {
    fn record(&mut self, summary: &EpisodeSummary) {
        self.outcomes.record(summary.outcome);
        self.reward += summary.reward;
        self.steps += summary.steps;
    }

    fn mean(&self, total: f64) -> f64 {
        match self.outcomes.total() {
            0 => 0.0,
            n => total / n as f64,
        }
    }
}

fn due(episode: usize, interval: usize) -> bool {
    interval > 0 && episode % interval == 0
}

/// Q-learning training loop
pub struct Trainer {
    config: TrainingConfig,
    agent: QLearningAgent,
    scheduler: Scheduler,
    curriculum: Curriculum,
    coverage: CoverageTracker,
    early_stopping: EarlyStopping,
    repository: Option<Arc<dyn TableRepository>>,
    observers: Vec<Box<dyn Observer>>,
    rng: StdRng,
}

impl Trainer {
    /// Create a trainer for `config` with coverage measured against `reachable`
    pub fn new(config: TrainingConfig, reachable: Arc<HashSet<StateKey>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            agent: QLearningAgent::new(),
            scheduler: Scheduler::new(config.exploration, config.learning_rate),
            curriculum: Curriculum::new(config.opponents.clone()),
            coverage: CoverageTracker::new(reachable),
            early_stopping: EarlyStopping::new(config.early_stop_window, config.early_stop_delta),
            repository: None,
            observers: Vec::new(),
            rng: build_rng(config.seed),
            config,
        })
    }

    /// Persist checkpoints and the final table through `repository`
    pub fn with_repository(mut self, repository: Arc<dyn TableRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Add an observer to the pipeline
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Continue from an existing agent; its visited states count as covered
    pub fn with_agent(mut self, agent: QLearningAgent) -> Self {
        self.coverage.seed_from(agent.visits().iter().map(|(key, _)| key));
        self.agent = agent;
        self
    }

    /// Continue from a persisted snapshot (table, visits and version)
    pub fn resume_from(self, snapshot: &PersistedTable) -> Self {
        info!(
            version = snapshot.version,
            rows = snapshot.q.len(),
            "resuming from saved Q-table"
        );
        self.with_agent(snapshot.to_agent())
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn into_agent(self) -> QLearningAgent {
        self.agent
    }

    pub fn coverage(&self) -> &CoverageTracker {
        &self.coverage
    }

    /// Run every configured episode, or until early stopping triggers
    pub fn run(&mut self) -> Result<TrainingReport> {
        let total = self.config.episodes;
        info!(
            episodes = total,
            reachable = self.coverage.reachable_count(),
            opponents = ?self.curriculum.opponents(),
            "starting training"
        );
        for observer in &mut self.observers {
            observer.on_training_start(total)?;
        }

        let mut overall = Tally::default();
        let mut interval = Tally::default();
        let mut pruned_rows = 0;
        let mut checkpoints = Vec::new();
        let mut evaluations = Vec::new();
        let mut stop_reason = StopReason::Completed;

        for episode in 0..total {
            let progress = episode as f64 / total as f64;
            let summary = self.run_episode(episode, progress)?;
            overall.record(&summary);
            interval.record(&summary);

            let played = episode + 1;

            if due(played, self.config.log_interval) {
                info!(
                    episode = played,
                    wins = interval.outcomes.wins,
                    draws = interval.outcomes.draws,
                    losses = interval.outcomes.losses,
                    avg_reward = interval.mean(interval.reward),
                    avg_length = interval.mean(interval.steps as f64),
                    epsilon = summary.epsilon,
                    coverage_pct = summary.coverage_pct,
                    table_size = self.agent.q_table_size(),
                    "training progress"
                );
                interval = Tally::default();
            }

            if due(played, self.config.prune_interval) {
                let removed =
                    self.agent.prune(self.config.prune_min_visits, self.config.prune_max_abs);
                pruned_rows += removed;
                debug!(
                    episode = played,
                    removed,
                    remaining = self.agent.q_table_size(),
                    "pruned Q-table"
                );
            }

            if due(played, self.config.checkpoint_interval) {
                if let Some(location) = self.checkpoint(played) {
                    for observer in &mut self.observers {
                        observer.on_checkpoint(played, &location)?;
                    }
                    checkpoints.push(location);
                }
            }

            if due(played, self.config.eval_interval) {
                let report = self.evaluate(played);
                for observer in &mut self.observers {
                    observer.on_evaluation(&report)?;
                }
                let mean_win_rate = report.mean_win_rate();
                evaluations.push(report);
                if self.early_stopping.record(mean_win_rate) {
                    info!(episode = played, mean_win_rate, "evaluation win rate converged");
                    stop_reason = StopReason::Converged { episode: played };
                    break;
                }
            }
        }

        self.agent.bump_version();
        self.persist_final();

        let n = overall.outcomes.total();
        let rate = |k: usize| if n > 0 { k as f64 / n as f64 } else { 0.0 };
        let report = TrainingReport {
            episodes_run: n,
            wins: overall.outcomes.wins,
            draws: overall.outcomes.draws,
            losses: overall.outcomes.losses,
            win_rate: rate(overall.outcomes.wins),
            draw_rate: rate(overall.outcomes.draws),
            loss_rate: rate(overall.outcomes.losses),
            avg_reward: overall.mean(overall.reward),
            avg_length: overall.mean(overall.steps as f64),
            coverage_pct: self.coverage.coverage_pct(),
            reachable_states: self.coverage.reachable_count(),
            visited_states: self.coverage.visited_count(),
            table_size: self.agent.q_table_size(),
            pruned_rows,
            version: self.agent.version(),
            stop_reason,
            checkpoints,
            evaluations,
        };

        info!(
            episodes = report.episodes_run,
            win_rate = report.win_rate,
            coverage_pct = report.coverage_pct,
            table_size = report.table_size,
            "training finished"
        );
        for observer in &mut self.observers {
            observer.on_training_end(&report)?;
        }
        Ok(report)
    }

    /// Play and learn from one episode
    pub fn run_episode(&mut self, episode: usize, progress: f64) -> Result<EpisodeSummary> {
        for observer in &mut self.observers {
            observer.on_episode_start(episode)?;
        }

        let rules = self.config.rules;
        let epsilon = self.scheduler.exploration_epsilon(
            progress,
            self.coverage.coverage_fraction(),
            self.coverage.episodes_since_discovery(),
        );
        let opponent = self.curriculum.sample(progress, &mut self.rng);
        let max_steps = rules.max_turns as usize + 1;

        let mut state = rules.initial_state();
        let mut discovered = usize::from(self.coverage.observe(&state.key()));
        let mut reward = 0.0;
        let mut bonus_total = 0.0;
        let mut steps = 0;
        let mut outcome = None;

        while steps < max_steps {
            let key = state.key();
            let learner = self.agent.decide(&state, epsilon, &mut self.rng);
            let ctx = DecisionContext::new(state, &rules)
                .with_learner_table(self.agent.table())
                .with_epsilon(self.config.opponent_epsilon);
            let opponent_decision = opponent.decide(&ctx, &mut self.rng);

            let t = rules.step(&state, learner, opponent_decision);
            let next_key = t.next.key();

            let prior_visits = self.agent.visits().get(&next_key);
            self.agent.record_visit(&next_key);
            if self.coverage.observe(&next_key) {
                discovered += 1;
            }
            let bonus = self.scheduler.bonus(prior_visits);
            let alpha = self
                .scheduler
                .state_alpha(progress, self.agent.visits().get(&key));
            let td_error = self.agent.learn(
                &key,
                learner.action,
                t.reward + bonus,
                &next_key,
                t.done,
                self.config.gamma,
                alpha,
            );

            let record = StepRecord {
                step: steps,
                state,
                learner,
                opponent: opponent_decision,
                next: t.next,
                reward: t.reward,
                bonus,
                alpha,
                td_error,
                done: t.done,
            };
            for observer in &mut self.observers {
                observer.on_step(episode, &record)?;
            }

            reward += t.reward;
            bonus_total += bonus;
            steps += 1;
            state = t.next;
            if t.done {
                outcome = t.outcome;
                break;
            }
        }

        self.coverage.end_episode();

        let summary = EpisodeSummary {
            episode,
            opponent,
            outcome: outcome.unwrap_or_else(|| rules.judge(&state)),
            steps,
            reward,
            bonus: bonus_total,
            epsilon,
            coverage_pct: self.coverage.coverage_pct(),
            discovered,
        };
        for observer in &mut self.observers {
            observer.on_episode_end(&summary)?;
        }
        Ok(summary)
    }

    /// Greedy evaluation of the current table against every configured opponent
    pub fn evaluate(&mut self, episode: usize) -> EvaluationReport {
        let report = evaluate(
            self.agent.table(),
            &self.config.rules,
            self.curriculum.opponents(),
            self.config.eval_episodes,
            episode,
            &mut self.rng,
        );
        for result in &report.results {
            info!(
                episode,
                opponent = result.opponent.label(),
                win_rate = result.win_rate,
                draw_rate = result.draw_rate,
                loss_rate = result.loss_rate,
                avg_length = result.avg_length,
                "evaluation"
            );
        }
        report
    }

    /// Rounded snapshot of the current table with visit statistics
    pub fn snapshot(&self, episode: Option<usize>) -> PersistedTable {
        let mut meta = TableMeta::new(
            self.agent.visits().stats(),
            self.coverage.reachable_count(),
            self.coverage.coverage_pct(),
        )
        .with_saved_at(Utc::now().to_rfc3339());
        if let Some(episode) = episode {
            meta = meta.with_episode(episode);
        }
        PersistedTable::from_agent(&self.agent, Some(meta), self.config.precision)
    }

    /// Location of the checkpoint taken after `episode`
    pub fn checkpoint_location(&self, episode: usize) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        PathBuf::from(format!(
            "{}-{episode:08}-{timestamp}",
            self.config.checkpoint_prefix
        ))
    }

    /// Write a checkpoint; failures are logged and skipped
    fn checkpoint(&self, episode: usize) -> Option<PathBuf> {
        let Some(repository) = &self.repository else {
            debug!(episode, "no repository configured, skipping checkpoint");
            return None;
        };
        let location = self.checkpoint_location(episode);
        match repository.save(&self.snapshot(Some(episode)), &location) {
            Ok(()) => {
                info!(episode, path = %location.display(), "checkpoint saved");
                Some(location)
            }
            Err(err) => {
                warn!(episode, path = %location.display(), error = %err, "checkpoint failed");
                None
            }
        }
    }

    fn persist_final(&self) {
        let (Some(repository), Some(output)) = (&self.repository, &self.config.output) else {
            return;
        };
        match repository.save(&self.snapshot(None), output) {
            Ok(()) => info!(path = %output.display(), "saved final Q-table"),
            Err(err) => {
                warn!(path = %output.display(), error = %err, "failed to save final Q-table")
            }
        }
    }
}

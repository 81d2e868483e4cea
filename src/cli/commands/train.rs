//! Train command - Train a Q-table against the opponent curriculum

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;

use super::{app_for, export_json};
use crate::{
    app::App,
    cli::output::{
        print_kv, print_metrics, print_section, print_subsection, print_training_report,
    },
    pipeline::{
        JsonlObserver, MetricsObserver, MetricsSummary, OpponentPolicy, ProgressObserver,
        SharedObserver, TrainingConfig, TrainingReport,
    },
};

/// Contents of the `--report` file
#[derive(Debug, Serialize)]
struct TrainingExport<'a> {
    report: &'a TrainingReport,
    metrics: &'a MetricsSummary,
}

#[derive(Parser, Debug)]
#[command(about = "Train a Q-table against the opponent curriculum")]
pub struct TrainArgs {
    /// JSON training configuration; flags below override its fields
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of training episodes
    #[arg(long, short = 'e')]
    pub episodes: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to save the trained table (`.msgpack` selects MessagePack)
    #[arg(long, short = 'O')]
    pub output: Option<PathBuf>,

    /// Continue from a previously saved table
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Opponents to train against, comma separated
    #[arg(long, short = 'o', value_delimiter = ',')]
    pub opponents: Vec<OpponentPolicy>,

    /// Save a checkpoint every N episodes (0 disables)
    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    /// Prefix for checkpoint files
    #[arg(long)]
    pub checkpoint_prefix: Option<String>,

    /// Evaluate every N episodes (0 disables)
    #[arg(long)]
    pub eval_interval: Option<usize>,

    /// Prune the table every N episodes (0 disables)
    #[arg(long)]
    pub prune_interval: Option<usize>,

    /// Optional file for JSONL observations
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Include every turn in the JSONL observations
    #[arg(long, requires = "observations")]
    pub record_steps: bool,

    /// Optional path for writing the training report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    pub dump_config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl TrainArgs {
    fn resolve_config(&self) -> Result<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => TrainingConfig::default(),
        };

        if let Some(episodes) = self.episodes {
            config.episodes = episodes;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.output.is_some() {
            config.output = self.output.clone();
        }
        if self.resume.is_some() {
            config.resume = self.resume.clone();
        }
        if !self.opponents.is_empty() {
            config.opponents = self.opponents.clone();
        }
        if let Some(interval) = self.checkpoint_interval {
            config.checkpoint_interval = interval;
        }
        if let Some(prefix) = &self.checkpoint_prefix {
            config.checkpoint_prefix = prefix.clone();
        }
        if let Some(interval) = self.eval_interval {
            config.eval_interval = interval;
        }
        if let Some(interval) = self.prune_interval {
            config.prune_interval = interval;
        }

        config.validate()?;
        Ok(config)
    }
}

/// App that reads the resume table in its own format and writes in the
/// output's format
fn app_for_config(config: &TrainingConfig) -> App {
    let storage = config
        .output
        .clone()
        .or_else(|| config.resume.clone())
        .unwrap_or_else(|| PathBuf::from(&config.checkpoint_prefix));
    app_for(&storage, config.resume.as_deref(), None)
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let config = args.resolve_config()?;

    if let Some(path) = &args.dump_config {
        config.save(path)?;
        println!("✓ Configuration written to: {}", path.display());
        return Ok(());
    }

    print_section("Training Configuration");
    print_kv("Episodes", &config.episodes.to_string());
    let opponents: Vec<&str> = config.opponents.iter().map(|o| o.label()).collect();
    print_kv("Opponents", &opponents.join(", "));
    print_kv(
        "Rules",
        &format!(
            "hp {} / charge {} / turns {} / damage {}",
            config.rules.max_hp,
            config.rules.max_charge,
            config.rules.max_turns,
            config.rules.base_damage
        ),
    );
    if let Some(seed) = config.seed {
        print_kv("Seed", &seed.to_string());
    }
    if let Some(resume) = &config.resume {
        print_kv("Resume from", &resume.display().to_string());
    }

    let app = app_for_config(&config);
    let metrics = Arc::new(Mutex::new(MetricsObserver::new()));
    let mut trainer = app
        .create_trainer(config)?
        .with_observer(Box::new(SharedObserver::new(Arc::clone(&metrics))));
    if !args.no_progress {
        trainer = trainer.with_observer(Box::new(ProgressObserver::new()));
    }
    if let Some(path) = &args.observations {
        let observer = JsonlObserver::new(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let observer = if args.record_steps {
            observer.with_steps()
        } else {
            observer
        };
        trainer = trainer.with_observer(Box::new(observer));
    }

    let report = trainer.run()?;
    let metrics = metrics.lock().summary();
    print_training_report(&report);
    print_metrics(&metrics);

    if !report.checkpoints.is_empty() {
        print_subsection("Checkpoints");
        for path in &report.checkpoints {
            println!("  {}", path.display());
        }
    }
    if let Some(output) = &trainer.config().output {
        println!("\n✓ Table saved to: {}", output.display());
    }
    if let Some(path) = &args.report {
        export_json(
            &TrainingExport {
                report: &report,
                metrics: &metrics,
            },
            path,
        )?;
        println!("✓ Report written to: {}", path.display());
    }

    Ok(())
}

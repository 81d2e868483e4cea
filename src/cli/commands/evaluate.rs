//! Evaluate command - Play a saved table greedily against opponents

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::{app_for, export_json, load_rules};
use crate::{
    cli::output::{print_evaluation, print_kv, print_section},
    pipeline::{OpponentPolicy, evaluate},
    q_learning::build_rng,
};

#[derive(Parser, Debug)]
#[command(about = "Evaluate a saved Q-table against opponents")]
pub struct EvaluateArgs {
    /// Path to the saved table
    pub table: PathBuf,

    /// Opponents to evaluate against, comma separated (default: all)
    #[arg(long, short = 'o', value_delimiter = ',')]
    pub opponents: Vec<OpponentPolicy>,

    /// Evaluation episodes per opponent
    #[arg(long, short = 'e', default_value_t = 100)]
    pub episodes: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file with game rules (default: standard rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Export results to file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

pub fn execute(args: EvaluateArgs) -> Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let app = app_for(&args.table, None, args.seed);

    println!("Loading table from: {}", args.table.display());
    let agent = app
        .load_agent(&args.table)
        .with_context(|| format!("failed to load table {}", args.table.display()))?;

    let opponents = if args.opponents.is_empty() {
        OpponentPolicy::ALL.to_vec()
    } else {
        args.opponents.clone()
    };

    print_section("Evaluation Configuration");
    print_kv("Table rows", &agent.q_table_size().to_string());
    print_kv("Table version", &agent.version().to_string());
    print_kv("Episodes", &args.episodes.to_string());
    if let Some(seed) = args.seed {
        print_kv("Seed", &seed.to_string());
    }

    let mut rng = build_rng(args.seed);
    let report = evaluate(
        agent.table(),
        &rules,
        &opponents,
        args.episodes,
        0,
        &mut rng,
    );

    print_section("Evaluation Results");
    print_evaluation(&report);

    if let Some(path) = &args.export {
        export_json(&report, path)?;
        println!("\n✓ Results exported to: {}", path.display());
    }
    Ok(())
}

//! skirmish CLI - Q-learning toolkit for the Attack/Defend/Charge duel
//!
//! This CLI provides a unified interface for:
//! - Training a Q-table against a curriculum of scripted opponents
//! - Evaluating saved tables
//! - Measuring coverage of the reachable state space
//! - Inspecting individual states
//! - Learning from externally recorded episodes

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(version, about = "Q-learning toolkit for the Attack/Defend/Charge duel", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a Q-table against the opponent curriculum
    Train(Box<skirmish::cli::commands::train::TrainArgs>),

    /// Evaluate a saved Q-table against opponents
    Evaluate(skirmish::cli::commands::evaluate::EvaluateArgs),

    /// Report reachable states and table coverage
    Coverage(skirmish::cli::commands::coverage::CoverageArgs),

    /// Show Q-values for one state
    Query(skirmish::cli::commands::query::QueryArgs),

    /// Learn from recorded episodes
    Submit(skirmish::cli::commands::submit::SubmitArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    skirmish::cli::logging::init_logging(cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Train(args) => skirmish::cli::commands::train::execute(*args),
        Commands::Evaluate(args) => skirmish::cli::commands::evaluate::execute(args),
        Commands::Coverage(args) => skirmish::cli::commands::coverage::execute(args),
        Commands::Query(args) => skirmish::cli::commands::query::execute(args),
        Commands::Submit(args) => skirmish::cli::commands::submit::execute(args),
    }
}

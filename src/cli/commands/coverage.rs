//! Coverage command - Compare a saved table against the reachable state space

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::{app_for, load_rules};
use crate::{
    cli::output::{format_number, print_kv, print_section},
    pipeline::coverage_pct,
};

#[derive(Parser, Debug)]
#[command(about = "Report the reachable state space and a table's coverage of it")]
pub struct CoverageArgs {
    /// Saved table to measure (omit to only size the state space)
    pub table: Option<PathBuf>,

    /// JSON file with game rules (default: standard rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

pub fn execute(args: CoverageArgs) -> Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let storage = args.table.clone().unwrap_or_default();
    let app = app_for(&storage, None, None);
    let reachable = app.reachable(&rules);

    print_section("State Space");
    print_kv("Max HP", &rules.max_hp.to_string());
    print_kv("Max charge", &rules.max_charge.to_string());
    print_kv("Max turns", &rules.max_turns.to_string());
    print_kv("Reachable states", &format_number(reachable.len()));

    let Some(path) = &args.table else {
        return Ok(());
    };
    let agent = app
        .load_agent(path)
        .with_context(|| format!("failed to load table {}", path.display()))?;
    let table = agent.table();
    let in_space = table.keys().filter(|key| reachable.contains(*key)).count();

    print_section("Table Coverage");
    print_kv("Table rows", &format_number(table.len()));
    print_kv("Reachable rows", &format_number(in_space));
    print_kv(
        "Coverage",
        &format!("{:.2}%", coverage_pct(table.keys(), &reachable)),
    );
    let stats = agent.visits().stats();
    print_kv(
        "Visits",
        &format!("min {} / max {} / avg {:.1}", stats.min, stats.max, stats.avg),
    );
    Ok(())
}

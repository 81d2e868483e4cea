//! Query command - Inspect the Q-row of one state

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use super::{app_for, load_rules};
use crate::{
    app::ServiceConfig,
    cli::output::{print_kv, print_q_row, print_section},
    game::{GameState, decode},
    identifiers::StateKey,
};

#[derive(Parser, Debug)]
#[command(about = "Show the Q-values and greedy action for a state")]
pub struct QueryArgs {
    /// Saved table to query (missing or unreadable tables count as empty)
    pub table: PathBuf,

    /// State key, `player_hp|player_charge|enemy_hp|enemy_charge|turn`
    #[arg(long, short = 'k', conflicts_with_all = ["player_hp", "enemy_hp"])]
    pub key: Option<String>,

    #[arg(long)]
    pub player_hp: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub player_charge: u32,

    #[arg(long)]
    pub enemy_hp: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub enemy_charge: u32,

    #[arg(long, default_value_t = 0)]
    pub turn: u32,

    /// JSON file with game rules (default: standard rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

impl QueryArgs {
    fn state(&self) -> Result<GameState> {
        if let Some(key) = &self.key {
            return Ok(decode(key));
        }
        match (self.player_hp, self.enemy_hp) {
            (Some(player_hp), Some(enemy_hp)) => Ok(GameState::new(
                player_hp,
                self.player_charge,
                enemy_hp,
                self.enemy_charge,
                self.turn,
            )),
            _ => bail!("pass either --key or both --player-hp and --enemy-hp"),
        }
    }
}

pub fn execute(args: QueryArgs) -> Result<()> {
    let state = args.state()?;
    let rules = load_rules(args.rules.as_deref())?;
    let app = app_for(&args.table, None, None);
    let service = app.create_policy_service(
        Some(args.table.as_path()),
        ServiceConfig::default().with_rules(rules),
    )?;

    let key: StateKey = state.key();
    let seen = service.with_agent(|agent| agent.table().contains(&key));
    let row = service.query(&key);

    print_section(&format!("State {key}"));
    print_kv("Seen in training", if seen { "yes" } else { "no" });
    print_kv(
        "Visits",
        &service
            .with_agent(|agent| agent.visits().get(&key))
            .to_string(),
    );
    print_q_row(&row);
    print_kv("Greedy action", service.greedy_action(&state).label());
    Ok(())
}

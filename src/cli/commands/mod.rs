//! Subcommands of the `skirmish` binary

pub mod coverage;
pub mod evaluate;
pub mod query;
pub mod submit;
pub mod train;

use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    app::{App, AppBuilder},
    adapters::repository_for_path,
    game::GameRules,
};

/// App saving in the format of `output` and reading prior tables in the
/// format of `input`
pub(crate) fn app_for(output: &Path, input: Option<&Path>, seed: Option<u64>) -> App {
    let mut builder = AppBuilder::new()
        .with_shared_repository(repository_for_path(output))
        .with_source_repository(repository_for_path(input.unwrap_or(output)));
    if let Some(seed) = seed {
        builder = builder.with_default_seed(seed);
    }
    builder.build()
}

/// Rules from a JSON file, or the standard rules
pub(crate) fn load_rules(path: Option<&Path>) -> Result<GameRules> {
    let Some(path) = path else {
        return Ok(GameRules::default());
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read rules from {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse rules in {}", path.display()))
}

/// Write `value` as pretty JSON
pub(crate) fn export_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))
}

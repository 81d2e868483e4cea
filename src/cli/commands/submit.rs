//! Submit command - Learn from externally played episodes

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use super::{app_for, load_rules};
use crate::{
    app::ServiceConfig,
    cli::output::{print_kv, print_section},
    service::SubmittedStep,
};

#[derive(Parser, Debug)]
#[command(about = "Apply recorded episodes to a saved table")]
pub struct SubmitArgs {
    /// Table to update (created if missing)
    pub table: PathBuf,

    /// JSON files, each holding one episode or a list of episodes
    #[arg(required = true)]
    pub episodes: Vec<PathBuf>,

    /// Where to save the updated table (default: overwrite the input table)
    #[arg(long, short = 'O')]
    pub output: Option<PathBuf>,

    /// Learning rate for submitted transitions
    #[arg(long, default_value_t = 0.1)]
    pub alpha: f64,

    /// Discount factor
    #[arg(long, default_value_t = 0.95)]
    pub gamma: f64,

    /// JSON file with game rules (default: standard rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Skip rejected episodes instead of failing
    #[arg(long)]
    pub keep_going: bool,
}

/// Accepts `[step, ...]` as well as `[[step, ...], ...]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpisodeFile {
    Single(Vec<SubmittedStep>),
    Many(Vec<Vec<SubmittedStep>>),
}

impl EpisodeFile {
    fn into_episodes(self) -> Vec<Vec<SubmittedStep>> {
        match self {
            EpisodeFile::Single(steps) => vec![steps],
            EpisodeFile::Many(episodes) => episodes,
        }
    }
}

fn read_episodes(path: &Path) -> Result<Vec<Vec<SubmittedStep>>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: EpisodeFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse episodes in {}", path.display()))?;
    Ok(file.into_episodes())
}

pub fn execute(args: SubmitArgs) -> Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let config = ServiceConfig::default()
        .with_rules(rules)
        .with_alpha(args.alpha)
        .with_gamma(args.gamma);

    let output = args.output.clone().unwrap_or_else(|| args.table.clone());
    let app = app_for(&output, Some(args.table.as_path()), None);
    let service = app.create_policy_service(Some(args.table.as_path()), config)?;
    let start_version = service.version();

    let mut applied = 0;
    let mut rejected = 0;
    for path in &args.episodes {
        for (index, episode) in read_episodes(path)?.iter().enumerate() {
            match service.submit_episode(episode) {
                Ok(_) => applied += 1,
                Err(err) if args.keep_going => {
                    tracing::warn!(file = %path.display(), index, error = %err, "episode rejected");
                    rejected += 1;
                }
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("episode {index} in {} was rejected", path.display())
                    });
                }
            }
        }
    }

    app.save_policy(&service, &output)?;

    print_section("Submission Results");
    print_kv("Applied", &applied.to_string());
    if rejected > 0 {
        print_kv("Rejected", &rejected.to_string());
    }
    print_kv(
        "Version",
        &format!("{start_version} -> {}", service.version()),
    );
    print_kv("Table rows", &service.q_table_size().to_string());
    println!("\n✓ Table saved to: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ActionInput;

    #[test]
    fn test_reads_single_and_multiple_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.json");
        std::fs::write(
            &single,
            r#"[{"learnerAction": "CHARGE", "opponentAction": 0}]"#,
        )
        .unwrap();
        let many = dir.path().join("many.json");
        std::fs::write(
            &many,
            r#"[[{"learnerAction": 2, "opponentAction": 2}], [{"learnerAction": "attack", "opponentAction": "defend"}]]"#,
        )
        .unwrap();

        let episodes = read_episodes(&single).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(
            episodes[0][0].learner_action,
            ActionInput::Label("CHARGE".to_string())
        );
        assert_eq!(read_episodes(&many).unwrap().len(), 2);
    }

    #[test]
    fn test_submitting_into_another_format_keeps_prior_table() {
        use crate::{
            adapters::{JsonFileRepository, MsgPackRepository},
            identifiers::StateKey,
            ports::TableRepository,
            q_learning::{PersistedTable, QLearningAgent},
        };

        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("table.msgpack");
        let output = dir.path().join("out.json");
        let episode = dir.path().join("episode.json");

        let mut agent = QLearningAgent::new();
        agent.query(&StateKey::new("30|3|30|3|7"));
        agent.bump_version();
        MsgPackRepository::new()
            .save(&PersistedTable::from_agent(&agent, None, 4), &table)
            .unwrap();
        std::fs::write(
            &episode,
            r#"[{"learnerAction": "CHARGE", "opponentAction": "CHARGE"}]"#,
        )
        .unwrap();

        let args = SubmitArgs::parse_from([
            "submit",
            table.to_str().unwrap(),
            episode.to_str().unwrap(),
            "-O",
            output.to_str().unwrap(),
        ]);
        execute(args).unwrap();

        let saved = JsonFileRepository::new().load(&output).unwrap();
        assert_eq!(saved.version, 2);
        assert!(saved.q.contains_key(&StateKey::new("30|3|30|3|7")));
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\"not\": \"episodes\"}").unwrap();
        assert!(read_episodes(&path).is_err());
    }
}

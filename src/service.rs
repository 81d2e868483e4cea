//! Served policy: incremental learning from submitted episodes
//!
//! External collaborators (a match server, a replay importer) submit whole
//! episodes and query Q-rows by state key. A submission is validated and
//! replayed against the rules without touching the table; only then are all
//! of its updates applied under one write guard and the table version bumped
//! once. Readers therefore never observe half of a submission.
//!
//! ```
//! use skirmish::{
//!     app::ServiceConfig,
//!     game::Action,
//!     q_learning::QLearningAgent,
//!     service::{PolicyService, SubmittedStep},
//! };
//!
//! let service = PolicyService::new(QLearningAgent::new(), ServiceConfig::default());
//! let steps = vec![
//!     SubmittedStep::new(Action::Charge, Action::Charge),
//!     SubmittedStep::new(Action::Attack, Action::Defend),
//! ];
//! assert_eq!(service.submit_episode(&steps)?, 1);
//! # Ok::<(), skirmish::Error>(())
//! ```

use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    app::ServiceConfig,
    game::{Action, GameRules, GameState, Transition},
    identifiers::StateKey,
    q_learning::{PersistedTable, QLearningAgent, QRow},
};

/// An action as submitted: a label (`"ATTACK"`) or an index (`0`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionInput {
    Index(i64),
    Label(String),
}

impl ActionInput {
    /// The action this input names, if it is valid
    pub fn resolve(&self) -> Option<Action> {
        match self {
            ActionInput::Index(index) => usize::try_from(*index).ok().and_then(Action::from_index),
            ActionInput::Label(label) => Action::from_str(label).ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            ActionInput::Index(index) => index.to_string(),
            ActionInput::Label(label) => label.clone(),
        }
    }
}

impl From<Action> for ActionInput {
    fn from(action: Action) -> Self {
        ActionInput::Label(action.label().to_string())
    }
}

/// One turn of a submitted episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedStep {
    pub learner_action: ActionInput,
    pub opponent_action: ActionInput,
    /// Defaults to the learner's full charge
    #[serde(
        default,
        deserialize_with = "saturating_spend",
        skip_serializing_if = "Option::is_none"
    )]
    pub learner_spend: Option<i64>,
    /// Defaults to the opponent's full charge
    #[serde(
        default,
        deserialize_with = "saturating_spend",
        skip_serializing_if = "Option::is_none"
    )]
    pub opponent_spend: Option<i64>,
}

/// Accept any JSON number as a spend, truncating fractions and saturating
/// at the `i64` bounds; the rules clamp it to the actor's charge later.
fn saturating_spend<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let spend = match (number.as_i64(), number.as_u64()) {
        (Some(spend), _) => spend,
        (None, Some(_)) => i64::MAX,
        // `as` saturates and maps NaN to zero
        (None, None) => number.as_f64().map_or(0, |spend| spend as i64),
    };
    Ok(Some(spend))
}

impl SubmittedStep {
    pub fn new(learner: Action, opponent: Action) -> Self {
        Self {
            learner_action: learner.into(),
            opponent_action: opponent.into(),
            learner_spend: None,
            opponent_spend: None,
        }
    }

    pub fn with_spends(mut self, learner: i64, opponent: i64) -> Self {
        self.learner_spend = Some(learner);
        self.opponent_spend = Some(opponent);
        self
    }
}

/// A validated turn, ready to be learned from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayedStep {
    pub state: GameState,
    pub learner_action: Action,
    pub transition: Transition,
}

/// Validate and replay a submission from the initial state
///
/// Pure: nothing is learned. Every action is checked before any turn is
/// replayed, and a step following the terminal transition rejects the whole
/// submission.
pub fn replay_episode(
    rules: &GameRules,
    steps: &[SubmittedStep],
    max_steps: usize,
) -> Result<Vec<ReplayedStep>> {
    if steps.is_empty() {
        return Err(Error::EmptySubmission);
    }
    if steps.len() > max_steps {
        return Err(Error::SubmissionTooLong {
            len: steps.len(),
            max: max_steps,
        });
    }

    let resolve = |step: usize, input: &ActionInput| {
        input.resolve().ok_or_else(|| Error::InvalidSubmittedAction {
            step,
            value: input.describe(),
        })
    };
    let actions = steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            Ok((
                resolve(i, &step.learner_action)?,
                resolve(i, &step.opponent_action)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut state = rules.initial_state();
    let mut replayed = Vec::with_capacity(steps.len());
    for (i, (step, (learner, opponent))) in steps.iter().zip(actions).enumerate() {
        if replayed.last().is_some_and(|r: &ReplayedStep| r.transition.done) {
            return Err(Error::StepsAfterTerminal { step: i });
        }
        let learner_spend = step
            .learner_spend
            .unwrap_or(i64::from(state.player_charge.max(1)));
        let opponent_spend = step
            .opponent_spend
            .unwrap_or(i64::from(state.enemy_charge.max(1)));
        let transition = rules.transition(&state, learner, learner_spend, opponent, opponent_spend);
        replayed.push(ReplayedStep {
            state,
            learner_action: learner,
            transition,
        });
        state = transition.next;
    }
    Ok(replayed)
}

/// The served, incrementally trained policy
#[derive(Debug)]
pub struct PolicyService {
    config: ServiceConfig,
    agent: RwLock<QLearningAgent>,
}

impl PolicyService {
    pub fn new(agent: QLearningAgent, config: ServiceConfig) -> Self {
        Self {
            config,
            agent: RwLock::new(agent),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Number of submissions applied to the table
    pub fn version(&self) -> u64 {
        self.agent.read().version()
    }

    pub fn q_table_size(&self) -> usize {
        self.agent.read().q_table_size()
    }

    /// Q-row for `key`, inserting a zero row if absent
    ///
    /// A query is never counted as a visit.
    pub fn query(&self, key: &StateKey) -> QRow {
        {
            let agent = self.agent.read();
            if let Some(row) = agent.table().get(key) {
                return *row;
            }
        }
        self.agent.write().query(key)
    }

    /// Greedy action for `state`, with the unseen-state heuristic
    pub fn greedy_action(&self, state: &GameState) -> Action {
        self.agent.read().greedy_action(state)
    }

    /// Learn from one submitted episode; returns the new table version
    ///
    /// # Errors
    ///
    /// Rejects empty, overlong, malformed or over-terminal submissions without
    /// changing the table or its version.
    pub fn submit_episode(&self, steps: &[SubmittedStep]) -> Result<u64> {
        let replayed = replay_episode(&self.config.rules, steps, self.config.max_submission_steps)?;

        let mut agent = self.agent.write();
        for step in &replayed {
            let key = step.state.key();
            let next_key = step.transition.next.key();
            agent.record_visit(&next_key);
            agent.learn(
                &key,
                step.learner_action,
                step.transition.reward,
                &next_key,
                step.transition.done,
                self.config.gamma,
                self.config.alpha,
            );
        }
        let version = agent.bump_version();
        drop(agent);

        debug!(steps = replayed.len(), version, "applied submitted episode");
        Ok(version)
    }

    /// Rounded snapshot for persistence
    pub fn snapshot(&self) -> PersistedTable {
        PersistedTable::from_agent(&self.agent.read(), None, self.config.precision)
    }

    /// Run `f` with shared access to the agent
    pub fn with_agent<R>(&self, f: impl FnOnce(&QLearningAgent) -> R) -> R {
        f(&self.agent.read())
    }

    pub fn into_agent(self) -> QLearningAgent {
        self.agent.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PolicyService {
        PolicyService::new(QLearningAgent::new(), ServiceConfig::default())
    }

    #[test]
    fn test_action_input_parsing() {
        let parse = |json: &str| serde_json::from_str::<ActionInput>(json).unwrap().resolve();
        assert_eq!(parse("0"), Some(Action::Attack));
        assert_eq!(parse("2"), Some(Action::Charge));
        assert_eq!(parse("\"defend\""), Some(Action::Defend));
        assert_eq!(parse("5"), None);
        assert_eq!(parse("-1"), None);
        assert_eq!(parse("\"FIREBALL\""), None);
    }

    #[test]
    fn test_submitted_step_json_shape() {
        let step: SubmittedStep =
            serde_json::from_str(r#"{"learnerAction": "ATTACK", "opponentAction": 1, "learnerSpend": 2}"#)
                .unwrap();
        assert_eq!(step.learner_action.resolve(), Some(Action::Attack));
        assert_eq!(step.opponent_action.resolve(), Some(Action::Defend));
        assert_eq!(step.learner_spend, Some(2));
        assert_eq!(step.opponent_spend, None);
    }

    #[test]
    fn test_invalid_action_rejects_without_side_effects() {
        let service = service();
        let steps = vec![SubmittedStep {
            learner_action: ActionInput::Index(5),
            opponent_action: ActionInput::Index(0),
            learner_spend: None,
            opponent_spend: None,
        }];
        let err = service.submit_episode(&steps).unwrap_err();
        assert!(matches!(err, Error::InvalidSubmittedAction { step: 0, .. }));
        assert_eq!(service.version(), 0);
        assert_eq!(service.q_table_size(), 0);
    }

    #[test]
    fn test_invalid_late_step_rejects_earlier_steps_too() {
        let service = service();
        let mut steps = vec![SubmittedStep::new(Action::Charge, Action::Charge)];
        steps.push(SubmittedStep {
            learner_action: ActionInput::Label("nope".to_string()),
            opponent_action: Action::Attack.into(),
            learner_spend: None,
            opponent_spend: None,
        });
        assert!(service.submit_episode(&steps).is_err());
        assert_eq!(service.q_table_size(), 0);
    }

    #[test]
    fn test_empty_and_overlong_submissions() {
        let service = PolicyService::new(
            QLearningAgent::new(),
            ServiceConfig::default().with_max_submission_steps(2),
        );
        assert!(matches!(service.submit_episode(&[]), Err(Error::EmptySubmission)));
        let steps = vec![SubmittedStep::new(Action::Defend, Action::Defend); 3];
        assert!(matches!(
            service.submit_episode(&steps),
            Err(Error::SubmissionTooLong { len: 3, max: 2 })
        ));
        assert_eq!(service.version(), 0);
    }

    #[test]
    fn test_steps_after_terminal_are_rejected() {
        let rules = GameRules {
            max_turns: 2,
            ..GameRules::default()
        };
        let steps = vec![SubmittedStep::new(Action::Defend, Action::Defend); 3];
        let err = replay_episode(&rules, &steps, 64).unwrap_err();
        assert!(matches!(err, Error::StepsAfterTerminal { step: 2 }));
    }

    #[test]
    fn test_submission_updates_table_once_per_step() {
        let service = service();
        let steps = vec![
            SubmittedStep::new(Action::Charge, Action::Charge),
            SubmittedStep::new(Action::Attack, Action::Charge),
        ];
        assert_eq!(service.submit_episode(&steps).unwrap(), 1);
        assert_eq!(service.submit_episode(&steps).unwrap(), 2);

        let start = GameRules::default().initial_state().key();
        service.with_agent(|agent| {
            assert!(agent.table().contains(&start));
            assert_eq!(agent.visits().get(&start), 0);
            assert_eq!(agent.visits().get(&StateKey::new("30|1|30|1|1")), 2);
        });
    }

    #[test]
    fn test_spend_defaults_to_full_charge() {
        let rules = GameRules::default();
        let steps = vec![
            SubmittedStep::new(Action::Charge, Action::Charge),
            SubmittedStep::new(Action::Charge, Action::Charge),
            SubmittedStep::new(Action::Attack, Action::Charge),
            SubmittedStep::new(Action::Attack, Action::Charge).with_spends(1, 1),
        ];
        let replayed = replay_episode(&rules, &steps, 64).unwrap();
        assert_eq!(replayed[2].transition.damage_dealt, 12);
        assert_eq!(replayed[3].transition.damage_dealt, 6);
    }

    #[test]
    fn test_fractional_and_out_of_range_spends_are_accepted() {
        let parse = |spend: &str| {
            let json = format!(r#"{{"learnerAction": "ATTACK", "opponentAction": 2, "learnerSpend": {spend}}}"#);
            serde_json::from_str::<SubmittedStep>(&json).unwrap().learner_spend
        };
        assert_eq!(parse("2.7"), Some(2));
        assert_eq!(parse("-5"), Some(-5));
        assert_eq!(parse("1e30"), Some(i64::MAX));
        assert_eq!(parse("-1e30"), Some(i64::MIN));
        assert_eq!(parse("18446744073709551615"), Some(i64::MAX));
        assert_eq!(parse("null"), None);

        let damage = |spend: &str| {
            let json = format!(
                r#"[
                    {{"learnerAction": "CHARGE", "opponentAction": "CHARGE"}},
                    {{"learnerAction": "CHARGE", "opponentAction": "CHARGE"}},
                    {{"learnerAction": "ATTACK", "opponentAction": "CHARGE", "learnerSpend": {spend}}}
                ]"#
            );
            let steps: Vec<SubmittedStep> = serde_json::from_str(&json).unwrap();
            let service = service();
            service.submit_episode(&steps).unwrap();
            replay_episode(&GameRules::default(), &steps, 64).unwrap()[2]
                .transition
                .damage_dealt
        };
        assert_eq!(damage("2.7"), 12);
        assert_eq!(damage("1e30"), 12);
        assert_eq!(damage("-5"), 6);
        assert_eq!(damage("1.2"), 6);
    }

    #[test]
    fn test_query_creates_zero_row_without_visit() {
        let service = service();
        let key = StateKey::new("12|1|18|0|4");
        assert_eq!(service.query(&key), QRow::default());
        assert_eq!(service.q_table_size(), 1);
        service.with_agent(|agent| assert_eq!(agent.visits().get(&key), 0));
        assert_eq!(service.version(), 0);
    }
}

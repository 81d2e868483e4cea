//! Tabular Q-learning
//!
//! This module implements one-step temporal difference control for the duel
//! game. Values are stored per state key in a [`QTable`]; each row holds one
//! estimate per [`Action`](crate::game::Action).
//!
//! ## Update rule
//!
//! ```text
//! target  = r                          if the transition ended the game
//!         = r + γ · max_a' Q(s', a')   otherwise
//! Q(s, a) ← Q(s, a) + α · (target − Q(s, a))
//! ```
//!
//! ## Usage Example
//!
//! ```
//! use skirmish::game::{Action, GameRules};
//! use skirmish::q_learning::QLearningAgent;
//!
//! let rules = GameRules::default();
//! let start = rules.initial_state();
//! let t = rules.transition(&start, Action::Charge, 1, Action::Attack, 1);
//!
//! let mut agent = QLearningAgent::new();
//! agent.record_visit(&t.next.key());
//! agent.learn(&start.key(), Action::Charge, t.reward, &t.next.key(), t.done, 0.95, 0.5);
//! assert_eq!(agent.q_table_size(), 2);
//! ```

pub mod agent;
pub mod q_table;
pub mod serialization;
pub mod visits;

// Public re-exports
pub use agent::{QLearningAgent, build_rng};
pub use q_table::{QRow, QTable};
pub use serialization::{DEFAULT_PRECISION, PersistedTable, TableMeta};
pub use visits::{VisitCounter, VisitStats};

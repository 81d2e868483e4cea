//! Attack/Defend/Charge duel game
//!
//! Two sides act simultaneously each turn. The learner and its opponent each
//! pick one of three actions; the pair is resolved by a pure transition
//! function that never fails and never draws random numbers.

pub mod action;
pub mod codec;
pub mod rules;
pub mod state;

pub use action::{ACTION_COUNT, Action, Decision};
pub use codec::{decode, encode};
pub use rules::{GameRules, Outcome, Transition};
pub use state::GameState;

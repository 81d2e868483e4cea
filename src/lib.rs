//! Tabular Q-learning for the Attack/Defend/Charge duel
//!
//! This crate provides:
//! - The duel's game model with a collision-free state codec
//! - A Q-table learner with visit-adaptive learning rates and pruning
//! - A training pipeline with an opponent curriculum, coverage-driven
//!   exploration, periodic evaluation, checkpoints and early stopping
//! - A thread-safe policy service that learns from submitted episodes
//! - JSON and MessagePack persistence of learned tables

pub mod adapters;
pub mod app;
pub mod cli;
pub mod error;
pub mod game;
pub mod identifiers;
pub mod pipeline;
pub mod ports;
pub mod q_learning;
pub mod service;

pub use error::{Error, Result};
pub use game::{Action, Decision, GameRules, GameState, Outcome};
pub use identifiers::StateKey;

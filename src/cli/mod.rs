//! CLI infrastructure for the skirmish toolkit
//!
//! This module provides the command-line interface for training, evaluating
//! and inspecting Q-tables, and for feeding recorded episodes back into them.

pub mod commands;
pub mod logging;
pub mod output;

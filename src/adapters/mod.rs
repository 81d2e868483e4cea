//! Adapters implementing domain ports.
//!
//! This module contains infrastructure implementations of the traits defined
//! in the ports module. Following hexagonal architecture, adapters depend on
//! domain ports, not the other way around.

pub mod in_memory_repository;
pub mod json_repository;
pub mod msgpack_repository;

use std::{path::Path, sync::Arc};

pub use in_memory_repository::InMemoryRepository;
pub use json_repository::JsonFileRepository;
pub use msgpack_repository::MsgPackRepository;

use crate::ports::TableRepository;

/// File repository matching the extension of `path`
///
/// `.msgpack` and `.mp` select MessagePack; everything else is JSON.
pub fn repository_for_path(path: &Path) -> Arc<dyn TableRepository> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("msgpack" | "mp") => Arc::new(MsgPackRepository::new()),
        _ => Arc::new(JsonFileRepository::pretty()),
    }
}

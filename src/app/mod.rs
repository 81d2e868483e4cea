//! Application layer with dependency injection container.
//!
//! This module provides the dependency injection infrastructure for the
//! application, following hexagonal architecture principles. The container
//! owns infrastructure dependencies and provides factory methods for creating
//! domain objects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │           Application Layer (app)           │
//! │  ┌──────────────────────────────────────┐   │
//! │  │           App (DI Container)         │   │
//! │  └──────────────┬───────────────────────┘   │
//! │                 │ owns                       │
//! │                 ▼                            │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  Infrastructure (adapters)           │   │
//! │  │  - JsonFileRepository                │   │
//! │  │  - MsgPackRepository                 │   │
//! │  │  - InMemoryRepository (testing)      │   │
//! │  └──────────────┬───────────────────────┘   │
//! │                 │ implements                 │
//! │                 ▼                            │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  Domain Ports (ports)                │   │
//! │  │  - TableRepository trait             │   │
//! │  └──────────────┬───────────────────────┘   │
//! │                 │ used by                    │
//! │                 ▼                            │
//! │  ┌──────────────────────────────────────┐   │
//! │  │  Domain Logic                        │   │
//! │  │  - Trainer                           │   │
//! │  │  - PolicyService                     │   │
//! │  └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production
//!
//! ```no_run
//! use skirmish::app::{App, ServiceConfig};
//! use std::path::Path;
//!
//! let app = App::new();
//! let service = app.create_policy_service(Some(Path::new("qtable.json")), ServiceConfig::default())?;
//! # Ok::<(), skirmish::Error>(())
//! ```
//!
//! ## Testing
//!
//! ```
//! use skirmish::app::App;
//! use skirmish::adapters::InMemoryRepository;
//!
//! let app = App::for_testing()
//!     .with_repository(InMemoryRepository::new())
//!     .with_default_seed(42)
//!     .build();
//! ```

pub mod config;
pub mod container;

pub use config::{DEFAULT_MAX_SUBMISSION_STEPS, ServiceConfig};
pub use container::{App, AppBuilder};

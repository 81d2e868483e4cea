//! Dependency injection container for the skirmish application.
//!
//! This module provides centralized dependency management following hexagonal
//! architecture principles. The container owns infrastructure dependencies and
//! provides factory methods for creating domain objects.

use std::{collections::HashSet, path::Path, sync::Arc};

use tracing::info;

use super::config::ServiceConfig;
use crate::{
    Result,
    adapters::JsonFileRepository,
    game::GameRules,
    identifiers::StateKey,
    pipeline::{ReachabilityCache, Trainer, TrainingConfig},
    ports::TableRepository,
    q_learning::QLearningAgent,
    service::PolicyService,
};

/// Application with dependency injection.
///
/// Centralizes creation and wiring of dependencies following hexagonal architecture.
/// All infrastructure dependencies are owned by the app and injected into
/// domain objects and use cases.
///
/// # Examples
///
/// ## Production usage
///
/// ```no_run
/// use skirmish::app::App;
/// use skirmish::pipeline::TrainingConfig;
///
/// let app = App::new();
/// let config = TrainingConfig {
///     episodes: 1_000,
///     seed: Some(42),
///     ..TrainingConfig::default()
/// };
/// let report = app.create_trainer(config)?.run()?;
/// println!("win rate {:.2}", report.win_rate);
/// # Ok::<(), skirmish::Error>(())
/// ```
///
/// ## Testing with dependency injection
///
/// ```
/// use skirmish::app::App;
/// use skirmish::adapters::InMemoryRepository;
///
/// let app = App::for_testing()
///     .with_repository(InMemoryRepository::new())
///     .with_default_seed(42)
///     .build();
/// ```
pub struct App {
    /// Repository for Q-table persistence
    repository: Arc<dyn TableRepository>,
    /// Repository prior tables are read from (defaults to `repository`)
    source: Arc<dyn TableRepository>,
    /// Default random seed (None = non-deterministic)
    default_seed: Option<u64>,
    /// Reachable-state sets, memoised per rules
    reachability: ReachabilityCache,
}

impl App {
    /// Create a new app with production defaults.
    ///
    /// Uses:
    /// - `JsonFileRepository` for table persistence
    /// - No default seed (non-deterministic RNG)
    pub fn new() -> Self {
        AppBuilder::new().build()
    }

    /// Create a builder for constructing app with custom dependencies.
    ///
    /// Primarily used for testing with in-memory dependencies.
    pub fn for_testing() -> AppBuilder {
        AppBuilder::new()
    }

    /// Get the table repository.
    ///
    /// Returns an Arc-wrapped repository that can be shared across threads.
    pub fn repository(&self) -> Arc<dyn TableRepository> {
        Arc::clone(&self.repository)
    }

    /// Get the repository prior tables are loaded from.
    pub fn source(&self) -> Arc<dyn TableRepository> {
        Arc::clone(&self.source)
    }

    /// Reachable states for `rules`, computed once per distinct rules value
    pub fn reachable(&self, rules: &GameRules) -> Arc<HashSet<StateKey>> {
        self.reachability.get(rules)
    }

    /// Create a trainer wired to this app's repository.
    ///
    /// The seed comes from the config, else from the app default. When the
    /// config names a table to resume from and it loads, training continues
    /// from it; an unusable table is logged and training starts fresh.
    pub fn create_trainer(&self, mut config: TrainingConfig) -> Result<Trainer> {
        config.seed = config.seed.or(self.default_seed);
        let resume = config.resume.clone();
        let reachable = self.reachable(&config.rules);

        let trainer = Trainer::new(config, reachable)?.with_repository(self.repository());
        match resume.and_then(|path| self.source.load_or_empty(&path)) {
            Some(snapshot) => Ok(trainer.resume_from(&snapshot)),
            None => Ok(trainer),
        }
    }

    /// Load an agent from persistent storage.
    ///
    /// # Errors
    ///
    /// Propagates repository errors; use [`App::load_agent_or_empty`] when a
    /// missing or corrupt table should mean "start from scratch".
    pub fn load_agent(&self, path: &Path) -> Result<QLearningAgent> {
        Ok(self.source.load(path)?.to_agent())
    }

    /// Load an agent, falling back to an empty one on any failure
    pub fn load_agent_or_empty(&self, path: &Path) -> QLearningAgent {
        self.source
            .load_or_empty(path)
            .map(|snapshot| snapshot.to_agent())
            .unwrap_or_default()
    }

    /// Create the served policy, starting from the table at `path` if given
    pub fn create_policy_service(
        &self,
        path: Option<&Path>,
        config: ServiceConfig,
    ) -> Result<Arc<PolicyService>> {
        config.validate()?;
        let agent = path.map_or_else(QLearningAgent::new, |p| self.load_agent_or_empty(p));
        info!(
            rows = agent.q_table_size(),
            version = agent.version(),
            "policy service ready"
        );
        Ok(Arc::new(PolicyService::new(agent, config)))
    }

    /// Save the served policy's current table.
    pub fn save_policy(&self, service: &PolicyService, path: &Path) -> Result<()> {
        self.repository.save(&service.snapshot(), path)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing app with custom dependencies.
///
/// Primarily used for testing to inject in-memory repositories and control
/// randomness.
///
/// # Examples
///
/// ```
/// use skirmish::app::AppBuilder;
/// use skirmish::adapters::InMemoryRepository;
///
/// let app = AppBuilder::new()
///     .with_repository(InMemoryRepository::new())
///     .with_default_seed(42)
///     .build();
/// ```
pub struct AppBuilder {
    repository: Option<Arc<dyn TableRepository>>,
    source: Option<Arc<dyn TableRepository>>,
    default_seed: Option<u64>,
}

impl AppBuilder {
    /// Create a new app builder.
    pub fn new() -> Self {
        Self {
            repository: None,
            source: None,
            default_seed: None,
        }
    }

    /// Set a custom table repository.
    pub fn with_repository<R: TableRepository + 'static>(mut self, repo: R) -> Self {
        self.repository = Some(Arc::new(repo));
        self
    }

    /// Set an already shared repository.
    pub fn with_shared_repository(mut self, repo: Arc<dyn TableRepository>) -> Self {
        self.repository = Some(repo);
        self
    }

    /// Read prior tables (resume, served, evaluated) from a different repository.
    ///
    /// Lets a table stored in one format be continued and saved in another.
    pub fn with_source_repository(mut self, repo: Arc<dyn TableRepository>) -> Self {
        self.source = Some(repo);
        self
    }

    /// Set a default random seed for every trainer created by this container.
    pub fn with_default_seed(mut self, seed: u64) -> Self {
        self.default_seed = Some(seed);
        self
    }

    /// Build the app with the configured dependencies.
    ///
    /// If no repository was specified, uses `JsonFileRepository` by default.
    pub fn build(self) -> App {
        let repository: Arc<dyn TableRepository> = self
            .repository
            .unwrap_or_else(|| Arc::new(JsonFileRepository::pretty()));
        App {
            source: self.source.unwrap_or_else(|| Arc::clone(&repository)),
            repository,
            default_seed: self.default_seed,
            reachability: ReachabilityCache::new(),
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{InMemoryRepository, MsgPackRepository},
        q_learning::PersistedTable,
    };

    fn small_rules() -> GameRules {
        GameRules {
            max_hp: 12,
            max_charge: 2,
            max_turns: 8,
            base_damage: 6,
        }
    }

    #[test]
    fn test_reachable_sets_are_shared() {
        let app = App::for_testing().build();
        let a = app.reachable(&small_rules());
        let b = app.reachable(&small_rules());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_app_applies_default_seed() {
        let app = App::for_testing().with_default_seed(42).build();
        let config = TrainingConfig {
            episodes: 5,
            rules: small_rules(),
            ..TrainingConfig::default()
        };
        let trainer = app.create_trainer(config).unwrap();
        assert_eq!(trainer.config().seed, Some(42));
    }

    #[test]
    fn test_config_seed_overrides_app_default() {
        let app = App::for_testing().with_default_seed(42).build();
        let config = TrainingConfig {
            episodes: 5,
            seed: Some(123),
            rules: small_rules(),
            ..TrainingConfig::default()
        };
        let trainer = app.create_trainer(config).unwrap();
        assert_eq!(trainer.config().seed, Some(123));
    }

    #[test]
    fn test_unusable_resume_table_starts_fresh() {
        let repo = InMemoryRepository::new();
        repo.insert_raw(Path::new("broken"), "{");
        let app = App::for_testing().with_repository(repo).build();
        let config = TrainingConfig {
            episodes: 5,
            rules: small_rules(),
            resume: Some("broken".into()),
            ..TrainingConfig::default()
        };
        let trainer = app.create_trainer(config).unwrap();
        assert_eq!(trainer.agent().q_table_size(), 0);
    }

    #[test]
    fn test_resume_reads_from_source_and_saves_to_repository() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.msgpack");
        let new = dir.path().join("new.json");

        let mut agent = QLearningAgent::new();
        for turn in 0..5 {
            let key = StateKey::new(format!("12|0|12|0|{turn}"));
            agent.query(&key);
            agent.record_visit(&key);
        }
        agent.bump_version();
        MsgPackRepository::new()
            .save(&PersistedTable::from_agent(&agent, None, 4), &old)
            .unwrap();

        let app = App::for_testing()
            .with_repository(JsonFileRepository::new())
            .with_source_repository(Arc::new(MsgPackRepository::new()))
            .build();
        let config = TrainingConfig {
            episodes: 5,
            seed: Some(3),
            rules: small_rules(),
            resume: Some(old),
            output: Some(new.clone()),
            ..TrainingConfig::default()
        };
        let mut trainer = app.create_trainer(config).unwrap();
        assert_eq!(trainer.agent().version(), 1);
        assert_eq!(trainer.agent().q_table_size(), 5);

        trainer.run().unwrap();
        let saved = JsonFileRepository::new().load(&new).unwrap();
        assert_eq!(saved.version, 2);
    }

    #[test]
    fn test_policy_service_starts_from_saved_table() {
        let repo = InMemoryRepository::new();
        let mut agent = QLearningAgent::new();
        agent.query(&StateKey::new("30|0|30|0|0"));
        agent.bump_version();
        repo.save(
            &PersistedTable::from_agent(&agent, None, 4),
            Path::new("served"),
        )
        .unwrap();

        let app = App::for_testing().with_repository(repo).build();
        let service = app
            .create_policy_service(Some(Path::new("served")), ServiceConfig::default())
            .unwrap();
        assert_eq!(service.version(), 1);
        assert_eq!(service.q_table_size(), 1);

        let missing = app
            .create_policy_service(Some(Path::new("missing")), ServiceConfig::default())
            .unwrap();
        assert_eq!(missing.version(), 0);
    }
}

//! Integration tests for the training pipeline wired through the app container.

use std::path::Path;

use skirmish::{
    GameRules, StateKey,
    adapters::InMemoryRepository,
    app::App,
    pipeline::{OpponentPolicy, StopReason, TrainingConfig},
    ports::TableRepository,
    q_learning::{QLearningAgent, QRow},
};

fn small_config() -> TrainingConfig {
    TrainingConfig {
        episodes: 40,
        seed: Some(7),
        rules: GameRules {
            max_hp: 12,
            max_charge: 2,
            max_turns: 8,
            base_damage: 6,
        },
        log_interval: 0,
        eval_interval: 0,
        ..TrainingConfig::default()
    }
}

#[test]
fn checkpoints_and_final_table_land_in_the_repository() {
    let repo = InMemoryRepository::new();
    let app = App::for_testing().with_repository(repo.clone()).build();
    let config = TrainingConfig {
        checkpoint_interval: 10,
        checkpoint_prefix: "ckpt/table".to_string(),
        output: Some("final".into()),
        ..small_config()
    };

    let report = app.create_trainer(config).unwrap().run().unwrap();

    assert_eq!(report.checkpoints.len(), 4);
    assert_eq!(repo.count(), 5);
    assert!(repo.contains(Path::new("final")));
    for location in &report.checkpoints {
        assert!(repo.contains(location));
        assert!(location.to_string_lossy().starts_with("ckpt/table-000000"));
    }

    let saved = repo.load(Path::new("final")).unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(saved.q.len(), report.table_size);
    let meta = saved.meta.expect("final table carries metadata");
    assert_eq!(meta.reachable_max, report.reachable_states);
}

#[test]
fn training_resumes_from_a_saved_table() {
    let repo = InMemoryRepository::new();
    let app = App::for_testing().with_repository(repo.clone()).build();
    let first = TrainingConfig {
        output: Some("table".into()),
        ..small_config()
    };
    let first_report = app.create_trainer(first).unwrap().run().unwrap();

    let second = TrainingConfig {
        episodes: 10,
        resume: Some("table".into()),
        output: Some("table".into()),
        ..small_config()
    };
    let mut trainer = app.create_trainer(second).unwrap();
    assert_eq!(trainer.agent().version(), 1);
    assert_eq!(trainer.agent().q_table_size(), first_report.table_size);
    assert!(trainer.coverage().visited_count() > 0);

    let report = trainer.run().unwrap();
    assert_eq!(report.version, 2);
    assert!(report.table_size >= first_report.table_size);
    assert_eq!(repo.load(Path::new("table")).unwrap().version, 2);
}

#[test]
fn flat_evaluations_stop_training_early() {
    let app = App::for_testing().build();
    let config = TrainingConfig {
        episodes: 200,
        opponents: vec![OpponentPolicy::Aggressive, OpponentPolicy::Random],
        eval_interval: 10,
        eval_episodes: 5,
        early_stop_window: 2,
        early_stop_delta: 1.5,
        ..small_config()
    };

    let report = app.create_trainer(config).unwrap().run().unwrap();
    assert_eq!(report.stop_reason, StopReason::Converged { episode: 20 });
    assert_eq!(report.episodes_run, 20);
    assert_eq!(report.evaluations.len(), 2);
    let last = report.last_evaluation().unwrap();
    assert_eq!(last.results.len(), 2);
    assert!(last.result_for(OpponentPolicy::Random).is_some());
}

#[test]
fn zero_delta_never_stops_training_early() {
    let app = App::for_testing().build();
    let config = TrainingConfig {
        episodes: 60,
        opponents: vec![OpponentPolicy::Aggressive, OpponentPolicy::Random],
        eval_interval: 10,
        eval_episodes: 5,
        early_stop_window: 2,
        early_stop_delta: 0.0,
        ..small_config()
    };

    let report = app.create_trainer(config).unwrap().run().unwrap();
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.episodes_run, 60);
    assert_eq!(report.evaluations.len(), 6);
}

#[test]
fn window_longer_than_the_run_never_stops_training_early() {
    let app = App::for_testing().build();
    let config = TrainingConfig {
        episodes: 30,
        eval_interval: 10,
        eval_episodes: 5,
        early_stop_window: 4,
        early_stop_delta: 1.5,
        ..small_config()
    };

    let report = app.create_trainer(config).unwrap().run().unwrap();
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.episodes_run, 30);
    assert_eq!(report.evaluations.len(), 3);
}

#[test]
fn pruning_keeps_rare_but_informative_rows() {
    let rare_flat = StateKey::new("12|0|12|0|1");
    let rare_sharp = StateKey::new("12|1|12|0|1");

    let mut agent = QLearningAgent::new();
    agent
        .table_mut()
        .insert(rare_flat.clone(), QRow::new([0.01, -0.02, 0.0]));
    agent
        .table_mut()
        .insert(rare_sharp.clone(), QRow::new([0.9, 0.0, 0.0]));
    agent.record_visit(&rare_flat);
    agent.record_visit(&rare_sharp);

    assert_eq!(agent.prune(2, 0.05), 1);
    assert!(!agent.table().contains(&rare_flat));
    assert!(agent.table().contains(&rare_sharp));
}

#[test]
fn periodic_pruning_is_reported() {
    let app = App::for_testing().build();
    let config = TrainingConfig {
        prune_interval: 10,
        prune_min_visits: u64::MAX,
        prune_max_abs: f64::MAX,
        ..small_config()
    };
    let report = app.create_trainer(config).unwrap().run().unwrap();
    assert!(report.pruned_rows > 0);
}

//! Integration tests for the served policy that learns from submitted episodes.

use std::{path::Path, sync::Arc, thread};

use skirmish::{
    Action, Error, GameRules, StateKey,
    adapters::InMemoryRepository,
    app::{App, ServiceConfig},
    service::{ActionInput, PolicyService, SubmittedStep},
};

fn opening() -> Vec<SubmittedStep> {
    vec![
        SubmittedStep::new(Action::Charge, Action::Charge),
        SubmittedStep::new(Action::Attack, Action::Defend),
    ]
}

#[test]
fn invalid_action_rejects_whole_submission() {
    let app = App::for_testing().build();
    let service = app
        .create_policy_service(None, ServiceConfig::default())
        .unwrap();

    let mut steps = opening();
    steps.push(SubmittedStep {
        learner_action: ActionInput::Index(5),
        opponent_action: ActionInput::Index(0),
        learner_spend: None,
        opponent_spend: None,
    });

    let err = service.submit_episode(&steps).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidSubmittedAction { step: 2, ref value } if value == "5"
    ));
    assert_eq!(service.version(), 0);
    assert_eq!(service.q_table_size(), 0);
}

#[test]
fn concurrent_submissions_each_bump_the_version_once() {
    let service = Arc::new(PolicyService::new(
        Default::default(),
        ServiceConfig::default(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..10 {
                    service.submit_episode(&opening()).unwrap();
                    let key = GameRules::default().initial_state().key();
                    let _ = service.query(&key);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(service.version(), 80);
    let visits = service.with_agent(|agent| {
        agent.visits().get(&StateKey::new("30|1|30|1|1"))
    });
    assert_eq!(visits, 80);
}

#[test]
fn queries_do_not_count_as_learning() {
    let service = PolicyService::new(Default::default(), ServiceConfig::default());
    let key = StateKey::new("30|2|18|0|4");

    let row = service.query(&key);
    assert_eq!(row.values(), [0.0; 3]);
    assert_eq!(service.version(), 0);
    assert_eq!(service.q_table_size(), 1);
    assert_eq!(service.with_agent(|agent| agent.visits().get(&key)), 0);
}

#[test]
fn winning_submission_raises_the_attack_value() {
    let rules = GameRules {
        max_hp: 6,
        ..GameRules::default()
    };
    let service = PolicyService::new(
        Default::default(),
        ServiceConfig::default().with_rules(rules).with_alpha(0.5),
    );
    let steps = vec![
        SubmittedStep::new(Action::Charge, Action::Charge),
        SubmittedStep::new(Action::Attack, Action::Charge),
    ];
    service.submit_episode(&steps).unwrap();

    let charged = rules.initial_state();
    let charged = rules
        .transition(&charged, Action::Charge, 0, Action::Charge, 0)
        .next;
    let row = service.query(&charged.key());
    assert_eq!(row.values()[Action::Attack.index()], 0.5);
    assert_eq!(service.greedy_action(&charged), Action::Attack);
}

#[test]
fn served_table_survives_a_restart() {
    let repo = InMemoryRepository::new();
    let app = App::for_testing().with_repository(repo).build();
    let path = Path::new("served");

    let service = app
        .create_policy_service(Some(path), ServiceConfig::default())
        .unwrap();
    service.submit_episode(&opening()).unwrap();
    service.submit_episode(&opening()).unwrap();
    app.save_policy(&service, path).unwrap();

    let restarted = app
        .create_policy_service(Some(path), ServiceConfig::default())
        .unwrap();
    assert_eq!(restarted.version(), 2);
    assert_eq!(restarted.q_table_size(), service.q_table_size());
}

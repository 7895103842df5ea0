use learn_game::config::{AgentConfig, TrainingConfig};
use learn_game::q_table::{q_table_file_name, q_table_from_disk_pickle};
use learn_game::{IsGameOver, Marks, Session};
use std::sync::atomic::AtomicBool;

fn training_config(episodes: usize) -> TrainingConfig {
    TrainingConfig {
        episodes,
        evaluation_games: 100,
        log_every: 500,
        seed: Some(11),
        ..TrainingConfig::default()
    }
}

#[test]
fn train_save_reload_and_play() {
    let dir = tempfile::tempdir().unwrap();
    let report = learn_game::train_rl_agents(
        dir.path(),
        AgentConfig::default(),
        training_config(2_000),
        &AtomicBool::new(false),
    )
    .unwrap();
    assert_eq!(report.training.games, 2_000);
    assert_eq!(report.evaluation.games, 100);

    for mark in [Marks::CROSS, Marks::NOUGHT] {
        let path = dir.path().join(q_table_file_name(mark));
        let saved = q_table_from_disk_pickle(&path).unwrap();
        let agent = learn_game::load_agent(dir.path(), mark, AgentConfig::default());
        assert!(!saved.is_empty());
        assert_eq!(agent.q_table(), &saved);
    }
    let snapshots = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".json"))
        .count();
    assert_eq!(snapshots, 2);

    // a human-style session keeps learning on top of the saved table
    let mut o = learn_game::load_agent(dir.path(), Marks::NOUGHT, AgentConfig::default())
        .with_seed(3);
    let mut x = learn_game::load_agent(dir.path(), Marks::CROSS, AgentConfig::default())
        .with_seed(4);
    let mut session = Session::new(&mut o);
    let outcome = session.play(&mut x, false).unwrap();
    assert_ne!(outcome, IsGameOver::InPlay);
    learn_game::save_agent(dir.path(), session.agent()).unwrap();
    let reloaded = learn_game::load_agent(dir.path(), Marks::NOUGHT, AgentConfig::default());
    assert_eq!(reloaded.q_table(), o.q_table());
}

#[test]
fn training_resumes_from_saved_tables() {
    let dir = tempfile::tempdir().unwrap();
    let stop = AtomicBool::new(false);
    learn_game::train_rl_agents(dir.path(), AgentConfig::default(), training_config(500), &stop)
        .unwrap();
    let first = learn_game::load_agent(dir.path(), Marks::CROSS, AgentConfig::default());
    learn_game::train_rl_agents(dir.path(), AgentConfig::default(), training_config(500), &stop)
        .unwrap();
    let second = learn_game::load_agent(dir.path(), Marks::CROSS, AgentConfig::default());
    assert!(second.q_table().len() >= first.q_table().len());
    assert!(first.q_table().keys().all(|key| second.q_table().contains_key(key)));

    let stats =
        learn_game::evaluate_saved_agents(dir.path(), AgentConfig::default(), 40, Some(5)).unwrap();
    assert_eq!(stats.games, 40);
    assert_eq!(stats.x_wins + stats.o_wins + stats.draws, 40);
}

#[test]
fn corrupt_tables_start_from_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(q_table_file_name(Marks::CROSS));
    std::fs::write(&path, b"\x00\x01not a table").unwrap();
    let agent = learn_game::load_agent(dir.path(), Marks::CROSS, AgentConfig::default());
    assert!(agent.q_table().is_empty());
}

#[test]
fn zero_episodes_are_refused_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let result = learn_game::train_rl_agents(
        dir.path(),
        AgentConfig::default(),
        training_config(0),
        &AtomicBool::new(false),
    );
    assert!(result.is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(
        learn_game::evaluate_saved_agents(dir.path(), AgentConfig::default(), 0, None).is_err()
    );
}

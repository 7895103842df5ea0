use crate::config::{AgentConfig, TrainingConfig};
use crate::q_table::{q_table_archive, q_table_file_name, q_table_load_or_empty, q_table_to_disk};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

pub mod agent;
pub mod board;
pub mod config;
pub mod error;
pub mod players;
pub mod q_table;
pub mod reward;
pub mod session;
pub mod trainer;

pub use agent::Agent;
pub use board::{Board, GameState, IsGameOver};
pub use error::{Error, Result};
pub use players::{HumanPlayer, Marks, Player};
pub use session::{Session, SessionStats};
pub use trainer::{MatchStats, Trainer};

/// Outcome tallies of one training run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrainingReport {
    pub training: MatchStats,
    pub evaluation: MatchStats,
}

/// Agent for `mark` starting from the table saved in `dir`, if there is one.
pub fn load_agent(dir: &Path, mark: Marks, config: AgentConfig) -> Agent {
    let path = dir.join(q_table_file_name(mark));
    Agent::new(mark, config).with_q_table(q_table_load_or_empty(&path))
}

/// Writes the agent's table to its file in `dir` and returns the path.
pub fn save_agent(dir: &Path, agent: &Agent) -> anyhow::Result<PathBuf> {
    let path = dir.join(q_table_file_name(agent.mark()));
    q_table_to_disk(&path, agent.q_table())?;
    log::info!(
        "saved {} states for {:?} to {}",
        agent.q_table().len(),
        agent.mark(),
        path.display()
    );
    Ok(path)
}

fn load_pair(dir: &Path, config: AgentConfig, seed: Option<u64>) -> (Agent, Agent) {
    let x = load_agent(dir, Marks::CROSS, config);
    let o = load_agent(dir, Marks::NOUGHT, config);
    match seed {
        Some(seed) => (
            x.with_seed(seed.wrapping_add(1)),
            o.with_seed(seed.wrapping_add(2)),
        ),
        None => (x, o),
    }
}

/// Loads both tables from `dir`, runs self-play, evaluates, then saves the tables
/// together with dated JSON snapshots.
pub fn train_rl_agents(
    dir: &Path,
    agent_config: AgentConfig,
    training_config: TrainingConfig,
    stop: &AtomicBool,
) -> anyhow::Result<TrainingReport> {
    agent_config.validate()?;
    let episodes = training_config.episodes;
    let evaluation_games = training_config.evaluation_games;
    let (x, o) = load_pair(dir, agent_config, training_config.seed);
    let mut trainer = Trainer::new(x, o, training_config)?;
    let training = trainer.train_until(episodes, stop)?;
    let evaluation = trainer.evaluate(evaluation_games)?;
    let (x, o) = trainer.into_agents();
    for agent in [&x, &o] {
        save_agent(dir, agent)?;
        let snapshot = q_table_archive(dir, agent.mark(), agent.q_table())
            .with_context(|| format!("archiving the {:?} table", agent.mark()))?;
        log::info!("snapshot written to {}", snapshot.display());
    }
    Ok(TrainingReport {
        training,
        evaluation,
    })
}

/// Greedy matches between the two saved tables in `dir`. Nothing is written back.
pub fn evaluate_saved_agents(
    dir: &Path,
    agent_config: AgentConfig,
    games: usize,
    seed: Option<u64>,
) -> anyhow::Result<MatchStats> {
    agent_config.validate()?;
    let (x, o) = load_pair(dir, agent_config, seed);
    let config = TrainingConfig {
        evaluation_games: games,
        seed,
        ..TrainingConfig::default()
    };
    let mut trainer = Trainer::new(x, o, config)?;
    Ok(trainer.evaluate(games)?)
}

use crate::error::{Error, Result};

pub const LEARNING_RATE: f32 = 0.1;
pub const DISCOUNT_RATE: f32 = 0.9;
pub const EXPLORATION_RATE: f32 = 0.1;

pub const NUM_EPISODES: usize = 50_000;
pub const EXPLORATION_DECAY: f32 = 0.9999;
pub const MIN_EXPLORATION_RATE: f32 = 0.01;
pub const EVALUATION_GAMES: usize = 1_000;
pub const LOG_EVERY: usize = 5_000;

pub const Q_TABLE_DIR: &str = "./q_table_archive/";

/// Hyperparameters of a single agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentConfig {
    pub learning_rate: f32,
    pub discount_rate: f32,
    pub exploration_rate: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            learning_rate: LEARNING_RATE,
            discount_rate: DISCOUNT_RATE,
            exploration_rate: EXPLORATION_RATE,
        }
    }
}

impl AgentConfig {
    /// Every rate must lie in [0, 1).
    pub fn validate(&self) -> Result<()> {
        check_unit("learning rate", self.learning_rate)?;
        check_unit("discount rate", self.discount_rate)?;
        check_unit("exploration rate", self.exploration_rate)
    }
}

/// Self-play schedule shared by both agents.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub exploration_decay: f32,
    pub min_exploration_rate: f32,
    pub evaluation_games: usize,
    pub log_every: usize,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            episodes: NUM_EPISODES,
            exploration_decay: EXPLORATION_DECAY,
            min_exploration_rate: MIN_EXPLORATION_RATE,
            evaluation_games: EVALUATION_GAMES,
            log_every: LOG_EVERY,
            seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.episodes == 0 || self.evaluation_games == 0 {
            return Err(invalid(
                "episode and evaluation game counts must be positive".to_owned(),
            ));
        }
        if !(self.exploration_decay > 0.0 && self.exploration_decay <= 1.0) {
            return Err(invalid(format!(
                "exploration decay must be in (0, 1], got {}",
                self.exploration_decay
            )));
        }
        check_unit("minimum exploration rate", self.min_exploration_rate)?;
        if self.log_every == 0 {
            return Err(invalid("log interval must be positive".to_owned()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidConfiguration { message }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be in [0, 1), got {value}")))
    }
}

/// Parses an episode or game count typed by the user.
pub fn parse_count(input: &str) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(format!(
            "expected a positive integer, got '{}'",
            input.trim()
        ))),
    }
}

pub fn parse_yes_no(input: &str) -> Result<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(invalid(format!("expected yes or no, got '{other}'"))),
    }
}

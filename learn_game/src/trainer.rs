//! Self-play training and greedy evaluation of a pair of agents.
//!
//! Each agent keeps its own table. After a winning move the winner learns
//! `1 + bonus` and the loser learns `-1`, both keyed to the winner's state and
//! action. After a drawing move both learn `bonus` on that pair. Any other move is
//! learned by the mover alone.

use crate::agent::{build_rng, Agent};
use crate::board::{Board, IsGameOver};
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::players::Marks;
use crate::reward;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};

pub const WIN_REWARD: f32 = 1.0;
pub const LOSS_REWARD: f32 = -1.0;

/// Win and draw counts over a batch of games.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub games: usize,
    pub x_wins: usize,
    pub o_wins: usize,
    pub draws: usize,
}

impl MatchStats {
    pub fn record(&mut self, outcome: IsGameOver) {
        match outcome {
            IsGameOver::Win(Marks::CROSS) => self.x_wins += 1,
            IsGameOver::Win(Marks::NOUGHT) => self.o_wins += 1,
            IsGameOver::Drawn => self.draws += 1,
            IsGameOver::Win(Marks::None) | IsGameOver::InPlay => return,
        }
        self.games += 1;
    }
}

/// The move that ended an episode.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub mover: Marks,
    pub state: String,
    pub action: usize,
    pub bonus: f32,
    pub next_state: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub first: Marks,
    pub outcome: IsGameOver,
    pub moves: usize,
    pub last: Transition,
}

#[derive(Debug)]
pub struct Trainer {
    agent_x: Agent,
    agent_o: Agent,
    board: Board,
    config: TrainingConfig,
    rng: StdRng,
    stats: MatchStats,
}

/// (mover, other) borrowed out of the pair.
fn pair<'a>(
    agent_x: &'a mut Agent,
    agent_o: &'a mut Agent,
    mover: Marks,
) -> (&'a mut Agent, &'a mut Agent) {
    if mover == Marks::CROSS {
        (agent_x, agent_o)
    } else {
        (agent_o, agent_x)
    }
}

impl Trainer {
    /// Takes one agent per mark, in either order.
    pub fn new(first: Agent, second: Agent, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let (agent_x, agent_o) = match (first.mark(), second.mark()) {
            (Marks::CROSS, Marks::NOUGHT) => (first, second),
            (Marks::NOUGHT, Marks::CROSS) => (second, first),
            (a, b) if a == b => return Err(Error::MarkConflict(a)),
            _ => {
                return Err(Error::InvalidConfiguration {
                    message: "self-play needs one X agent and one O agent".to_owned(),
                })
            }
        };
        Ok(Trainer {
            agent_x,
            agent_o,
            board: Board::new(),
            rng: build_rng(config.seed),
            config,
            stats: MatchStats::default(),
        })
    }

    pub fn agent(&self, mark: Marks) -> &Agent {
        match mark {
            Marks::NOUGHT => &self.agent_o,
            _ => &self.agent_x,
        }
    }

    pub fn into_agents(self) -> (Agent, Agent) {
        (self.agent_x, self.agent_o)
    }

    /// Totals over every training episode run so far.
    pub fn stats(&self) -> MatchStats {
        self.stats
    }

    fn starting_mark(&mut self) -> Marks {
        if self.rng.gen_bool(0.5) {
            Marks::CROSS
        } else {
            Marks::NOUGHT
        }
    }

    /// Plays one self-play game, learning after every move, then decays exploration.
    pub fn learn_episode(&mut self) -> Result<EpisodeSummary> {
        self.board.reset();
        let first = self.starting_mark();
        let mut mover = first;
        let mut moves = 0;
        loop {
            let (current, other) = pair(&mut self.agent_x, &mut self.agent_o, mover);
            let state = self.board.get_state();
            let action =
                current.choose_action(self.board.current(), &self.board.available_moves())?;
            let bonus = reward::shape(self.board.current(), mover, action, mover.other());
            let placed = self.board.make_move(action, mover);
            debug_assert!(placed, "agent picked occupied cell {action}");
            moves += 1;
            let next_state = self.board.get_state();
            let outcome = self.board.check_winner();
            match outcome {
                IsGameOver::InPlay => {
                    current.learn(&state, action, bonus, &next_state, false);
                    mover = mover.other();
                    continue;
                }
                IsGameOver::Win(_) => {
                    current.learn(&state, action, WIN_REWARD + bonus, &next_state, true);
                    other.learn(&state, action, LOSS_REWARD, &next_state, true);
                }
                IsGameOver::Drawn => {
                    current.learn(&state, action, bonus, &next_state, true);
                    other.learn(&state, action, bonus, &next_state, true);
                }
            }
            let (decay, floor) = (
                self.config.exploration_decay,
                self.config.min_exploration_rate,
            );
            self.agent_x.decay_exploration(decay, floor);
            self.agent_o.decay_exploration(decay, floor);
            self.stats.record(outcome);
            return Ok(EpisodeSummary {
                first,
                outcome,
                moves,
                last: Transition {
                    mover,
                    state,
                    action,
                    bonus,
                    next_state,
                },
            });
        }
    }

    pub fn train(&mut self, episodes: usize) -> Result<MatchStats> {
        self.train_until(episodes, &AtomicBool::new(false))
    }

    /// Like [`Trainer::train`], checking `stop` before each episode.
    pub fn train_until(&mut self, episodes: usize, stop: &AtomicBool) -> Result<MatchStats> {
        let mut stats = MatchStats::default();
        log::info!("training for {episodes} episodes");
        for episode in 1..=episodes {
            if stop.load(Ordering::Relaxed) {
                log::info!("training stopped after {} episodes", episode - 1);
                break;
            }
            let summary = self.learn_episode()?;
            stats.record(summary.outcome);
            if episode % self.config.log_every == 0 {
                log::info!(
                    "episode {:>8}/{}: exploration {:.4}, X wins {}, O wins {}, draws {}",
                    episode,
                    episodes,
                    self.agent_x.exploration_rate(),
                    stats.x_wins,
                    stats.o_wins,
                    stats.draws,
                );
            }
        }
        Ok(stats)
    }

    /// Plays `games` games with exploration off and no learning. Exploration rates
    /// are restored afterwards.
    pub fn evaluate(&mut self, games: usize) -> Result<MatchStats> {
        let saved = (
            self.agent_x.exploration_rate(),
            self.agent_o.exploration_rate(),
        );
        self.agent_x.set_exploration_rate(0.0);
        self.agent_o.set_exploration_rate(0.0);
        let result = (0..games).try_fold(MatchStats::default(), |mut stats, _| {
            stats.record(self.play_greedy_game()?);
            Ok::<_, Error>(stats)
        });
        self.agent_x.set_exploration_rate(saved.0);
        self.agent_o.set_exploration_rate(saved.1);
        let stats = result?;
        log::info!(
            "evaluation over {} games: X wins {}, O wins {}, draws {}",
            stats.games,
            stats.x_wins,
            stats.o_wins,
            stats.draws
        );
        Ok(stats)
    }

    fn play_greedy_game(&mut self) -> Result<IsGameOver> {
        self.board.reset();
        let mut mover = self.starting_mark();
        loop {
            let (current, _) = pair(&mut self.agent_x, &mut self.agent_o, mover);
            let action =
                current.choose_action(self.board.current(), &self.board.available_moves())?;
            let placed = self.board.make_move(action, mover);
            debug_assert!(placed, "agent picked occupied cell {action}");
            match self.board.check_winner() {
                IsGameOver::InPlay => mover = mover.other(),
                outcome => return Ok(outcome),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;

    fn trainer(seed: u64, config: TrainingConfig) -> Trainer {
        let agent_config = AgentConfig {
            exploration_rate: 0.4,
            ..AgentConfig::default()
        };
        let x = Agent::new(Marks::CROSS, agent_config).with_seed(seed);
        let o = Agent::new(Marks::NOUGHT, agent_config).with_seed(seed + 1);
        let config = TrainingConfig {
            seed: Some(seed),
            ..config
        };
        Trainer::new(o, x, config).unwrap()
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn is_game_working() {
        let mut t = trainer(1, TrainingConfig::default());
        let summary = t.learn_episode().unwrap();
        assert_ne!(summary.outcome, IsGameOver::InPlay);
        assert!((5..=9).contains(&summary.moves));
        assert_eq!(t.stats().games, 1);
    }

    #[test]
    fn either_mark_may_open_an_episode() {
        let mut t = trainer(7, TrainingConfig::default());
        let mut x_first = 0;
        for _ in 0..200 {
            let summary = t.learn_episode().unwrap();
            let last_mover = if summary.moves % 2 == 1 {
                summary.first
            } else {
                summary.first.other()
            };
            assert_eq!(summary.last.mover, last_mover);
            if summary.first == Marks::CROSS {
                x_first += 1;
            }
        }
        assert!((60..=140).contains(&x_first), "X opened {x_first} of 200");
    }

    #[test]
    fn terminal_updates_use_the_final_move_for_both_agents() {
        let (mut saw_win, mut saw_draw) = (false, false);
        for seed in 0..500 {
            let mut t = trainer(seed, TrainingConfig::default());
            let summary = t.learn_episode().unwrap();
            let last = &summary.last;
            match summary.outcome {
                IsGameOver::Win(winner) => {
                    assert_eq!(winner, last.mover);
                    let won = t.agent(winner).q_table().value(&last.state, last.action);
                    let lost = t
                        .agent(winner.other())
                        .q_table()
                        .value(&last.state, last.action);
                    assert!(close(won, 0.1 * (WIN_REWARD + last.bonus)));
                    assert!(close(lost, 0.1 * LOSS_REWARD));
                    saw_win = true;
                }
                IsGameOver::Drawn => {
                    for mark in [Marks::CROSS, Marks::NOUGHT] {
                        let value = t.agent(mark).q_table().value(&last.state, last.action);
                        assert!(close(value, 0.1 * last.bonus));
                    }
                    saw_draw = true;
                }
                IsGameOver::InPlay => unreachable!(),
            }
            if saw_win && saw_draw {
                break;
            }
        }
        assert!(saw_win && saw_draw);
    }

    #[test]
    fn exploration_decays_once_per_episode() {
        let config = TrainingConfig {
            exploration_decay: 0.5,
            min_exploration_rate: 0.05,
            ..TrainingConfig::default()
        };
        let mut t = trainer(3, config);
        t.learn_episode().unwrap();
        assert!(close(t.agent(Marks::CROSS).exploration_rate(), 0.2));
        assert!(close(t.agent(Marks::NOUGHT).exploration_rate(), 0.2));
        t.train(4).unwrap();
        assert!(close(t.agent(Marks::CROSS).exploration_rate(), 0.05));
    }

    #[test]
    fn training_tallies_every_episode() {
        let mut t = trainer(4, TrainingConfig::default());
        let stats = t.train(300).unwrap();
        assert_eq!(stats.games, 300);
        assert_eq!(stats.x_wins + stats.o_wins + stats.draws, 300);
        assert_eq!(t.stats(), stats);
        assert!(!t.agent(Marks::CROSS).q_table().is_empty());
        assert!(!t.agent(Marks::NOUGHT).q_table().is_empty());
    }

    #[test]
    fn stop_flag_is_checked_between_episodes() {
        let mut t = trainer(5, TrainingConfig::default());
        let stats = t.train_until(100, &AtomicBool::new(true)).unwrap();
        assert_eq!(stats.games, 0);
        assert!(t.agent(Marks::CROSS).q_table().is_empty());
    }

    #[test]
    fn evaluation_neither_learns_nor_keeps_exploration_off() {
        let mut t = trainer(6, TrainingConfig::default());
        t.train(200).unwrap();
        let tables = (
            t.agent(Marks::CROSS).q_table().clone(),
            t.agent(Marks::NOUGHT).q_table().clone(),
        );
        let rates = (
            t.agent(Marks::CROSS).exploration_rate(),
            t.agent(Marks::NOUGHT).exploration_rate(),
        );
        let stats = t.evaluate(50).unwrap();
        assert_eq!(stats.games, 50);
        assert_eq!(t.agent(Marks::CROSS).q_table(), &tables.0);
        assert_eq!(t.agent(Marks::NOUGHT).q_table(), &tables.1);
        assert_eq!(t.agent(Marks::CROSS).exploration_rate(), rates.0);
        assert_eq!(t.agent(Marks::NOUGHT).exploration_rate(), rates.1);
        assert_eq!(t.stats().games, 200);
    }

    #[test]
    fn agents_must_hold_different_marks() {
        let config = AgentConfig::default();
        let a = Agent::new(Marks::CROSS, config);
        let b = Agent::new(Marks::CROSS, config);
        assert!(matches!(
            Trainer::new(a, b, TrainingConfig::default()),
            Err(Error::MarkConflict(Marks::CROSS))
        ));
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use learn_game::config::{self, AgentConfig, TrainingConfig};
use learn_game::{HumanPlayer, IsGameOver, Marks, Session};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

#[derive(Parser, Debug)]
#[command(about = "Tic-tac-toe Q-learning: self-play training and games against the agent")]
struct Cli {
    /// Directory holding the saved tables
    #[arg(long, default_value = config::Q_TABLE_DIR)]
    dir: PathBuf,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Self-play training followed by an evaluation run
    Train {
        #[arg(long, value_parser = config::parse_count)]
        episodes: Option<usize>,
        #[arg(long, value_parser = config::parse_count)]
        evaluation_games: Option<usize>,
    },
    /// Greedy matches between the saved tables
    Evaluate {
        #[arg(long, value_parser = config::parse_count)]
        games: Option<usize>,
    },
    /// Play against the agent; it keeps learning after every game
    Play {
        #[arg(long, value_enum, default_value_t = Side::X)]
        mark: Side,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    X,
    O,
}

impl From<Side> for Marks {
    fn from(side: Side) -> Self {
        match side {
            Side::X => Marks::CROSS,
            Side::O => Marks::NOUGHT,
        }
    }
}

fn read_answer(input: &mut impl BufRead, question: &str) -> anyhow::Result<String> {
    print!("{question} ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("input closed");
    }
    Ok(line)
}

/// Asks until a positive integer is typed.
fn prompt_count(input: &mut impl BufRead, question: &str) -> anyhow::Result<usize> {
    loop {
        match config::parse_count(&read_answer(input, question)?) {
            Ok(n) => return Ok(n),
            Err(e) => println!("{e}"),
        }
    }
}

fn prompt_yes_no(input: &mut impl BufRead, question: &str) -> anyhow::Result<bool> {
    loop {
        match config::parse_yes_no(&read_answer(input, question)?) {
            Ok(answer) => return Ok(answer),
            Err(e) => println!("{e}"),
        }
    }
}

fn train(
    cli: &Cli,
    episodes: Option<usize>,
    evaluation_games: Option<usize>,
) -> anyhow::Result<()> {
    let mut input = io::stdin().lock();
    let episodes = match episodes {
        Some(n) => n,
        None => prompt_count(&mut input, "How many training episodes?")?,
    };
    let evaluation_games = match evaluation_games {
        Some(n) => n,
        None => prompt_count(&mut input, "How many evaluation games?")?,
    };
    let training_config = TrainingConfig {
        episodes,
        evaluation_games,
        seed: cli.seed,
        ..TrainingConfig::default()
    };
    log::info!(
        "training {episodes} episodes with tables in {}",
        cli.dir.display()
    );
    let report = learn_game::train_rl_agents(
        &cli.dir,
        AgentConfig::default(),
        training_config,
        &AtomicBool::new(false),
    )?;
    let eval = report.evaluation;
    println!(
        "Evaluation: X wins {}, O wins {}, draws {} out of {} games.",
        eval.x_wins, eval.o_wins, eval.draws, eval.games
    );
    Ok(())
}

fn evaluate(cli: &Cli, games: Option<usize>) -> anyhow::Result<()> {
    let games = match games {
        Some(n) => n,
        None => prompt_count(&mut io::stdin().lock(), "How many evaluation games?")?,
    };
    let stats =
        learn_game::evaluate_saved_agents(&cli.dir, AgentConfig::default(), games, cli.seed)?;
    println!(
        "X wins {}, O wins {}, draws {} out of {} games.",
        stats.x_wins, stats.o_wins, stats.draws, stats.games
    );
    Ok(())
}

fn play(cli: &Cli, side: Side) -> anyhow::Result<()> {
    let human_mark = Marks::from(side);
    let agent_mark = human_mark.other();
    let mut agent = learn_game::load_agent(&cli.dir, agent_mark, AgentConfig::default());
    if let Some(seed) = cli.seed {
        agent = agent.with_seed(seed);
    }
    log::info!(
        "agent plays {:?} with {} known states",
        agent_mark,
        agent.q_table().len()
    );
    let mut human = HumanPlayer::stdin("Human".to_owned(), human_mark);
    let mut session = Session::new(&mut agent);
    loop {
        let outcome = session.play(&mut human, agent_mark == Marks::CROSS)?;
        println!("{}", session.board().current().render());
        match outcome {
            IsGameOver::Win(mark) if mark == human_mark => {
                println!("Congratulations! You have won!")
            }
            IsGameOver::Win(_) => println!("Really sorry, you have lost."),
            _ => println!("The game ended in a draw."),
        }
        learn_game::save_agent(&cli.dir, session.agent())?;
        let stats = session.stats();
        println!(
            "Wins: {} | Losses: {} | Draws: {}",
            stats.opponent_wins, stats.agent_wins, stats.draws
        );
        if !prompt_yes_no(human.input(), "Play again? (y/n)")? {
            let games = stats.agent_wins + stats.opponent_wins + stats.draws;
            log::info!("session over after {games} games");
            return Ok(());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Some(Command::Train {
            episodes,
            evaluation_games,
        }) => train(&cli, episodes, evaluation_games),
        Some(Command::Evaluate { games }) => evaluate(&cli, games),
        Some(Command::Play { mark }) => play(&cli, mark),
        None => play(&cli, Side::X),
    }
}

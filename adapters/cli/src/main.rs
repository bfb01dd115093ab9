#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Tileworld scenario headlessly.

mod render;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use tileworld_core::{Event, GameStatus, PushInput};
use tileworld_system_interpreter::{Config as InterpreterConfig, Interpreter};
use tileworld_world::{self as world, query, Config as WorldConfig, World};

use scenario::Scenario;

/// Runs a Tileworld scenario without a window and prints the final grid.
#[derive(Parser, Debug)]
#[command(name = "tileworld", version)]
struct Cli {
    /// Scenario file in TOML format.
    scenario: PathBuf,

    /// Input script with one glyph per round: L, R, U or D presses that
    /// direction, A presses the A button and anything else presses nothing.
    #[arg(long, short, default_value = "")]
    inputs: String,

    /// Rounds to play; defaults to the length of the input script.
    #[arg(long)]
    rounds: Option<usize>,

    /// Seed of the move-conflict coin.
    #[arg(long)]
    seed: Option<u64>,

    /// Re-evaluate resting rules for every sprite each round.
    #[arg(long)]
    no_dirty_filter: bool,

    /// Paints recorded per round before commit scans the whole grid.
    #[arg(long, default_value_t = WorldConfig::default().paint_log_capacity())]
    paint_log_capacity: usize,

    /// Print the grid after every round, not only at the end.
    #[arg(long)]
    every_round: bool,
}

/// Settings of one headless session.
#[derive(Clone, Debug)]
struct Session {
    inputs: String,
    rounds: usize,
    world: WorldConfig,
    interpreter: InterpreterConfig,
    every_round: bool,
}

impl Session {
    fn from_cli(cli: &Cli) -> Self {
        let defaults = WorldConfig::default();
        let seed = cli.seed.unwrap_or_else(|| InterpreterConfig::default().seed());
        Self {
            inputs: cli.inputs.clone(),
            rounds: cli.rounds.unwrap_or_else(|| cli.inputs.chars().count()),
            world: WorldConfig::new(
                defaults.tile_length(),
                defaults.round_period(),
                cli.paint_log_capacity,
            ),
            interpreter: InterpreterConfig::new(!cli.no_dirty_filter, seed),
            every_round: cli.every_round,
        }
    }
}

/// Final state of a session.
#[derive(Debug)]
struct Outcome {
    world: World,
    status: GameStatus,
    rounds: usize,
}

/// Entry point for the Tileworld command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let scenario = scenario::load(&cli.scenario)?;
    let palette = scenario.palette.clone();
    let outcome = play(scenario, &Session::from_cli(&cli))?;

    if let Some(grid) = render::grid(&outcome.world, &palette) {
        println!("{grid}");
    }
    println!(
        "{:?} after {} rounds (round index {})",
        outcome.status,
        outcome.rounds,
        query::round_index(&outcome.world)
    );
    Ok(())
}

/// Sets the scenario's world and plays it for the session's rounds.
///
/// The initial round run by [`Interpreter::start`] is not counted. Play stops
/// early once the game is won or lost.
fn play(scenario: Scenario, session: &Session) -> Result<Outcome> {
    let Scenario {
        palette,
        rules,
        tiles,
        sprites,
    } = scenario;

    let mut world = World::new(session.world);
    world::set_world(&mut world, palette.catalog(), tiles, sprites)
        .context("scenario layout does not fit its kinds")?;
    let period = world.config().round_period();

    let mut interpreter = Interpreter::new(rules, session.interpreter);
    let mut events = Vec::new();
    let mut status = interpreter.start(&mut world, &mut events)?;
    report(&events);
    world::advance(&mut world, period);

    let mut inputs = session.inputs.chars();
    let mut rounds = 0;
    while rounds < session.rounds && status == GameStatus::InPlay {
        events.clear();
        status = interpreter.round(&mut world, &pressed(inputs.next()), &mut events)?;
        report(&events);
        world::advance(&mut world, period);
        rounds += 1;

        if session.every_round {
            if let Some(grid) = render::grid(&world, &palette) {
                println!("round {rounds}\n{grid}\n");
            }
        }
    }
    info!("session ended with {status:?} after {rounds} rounds");

    Ok(Outcome {
        world,
        status,
        rounds,
    })
}

fn pressed(glyph: Option<char>) -> Vec<PushInput> {
    match glyph.map(|glyph| glyph.to_ascii_uppercase()) {
        Some('L') => vec![PushInput::Left],
        Some('R') => vec![PushInput::Right],
        Some('U') => vec![PushInput::Up],
        Some('D') => vec![PushInput::Down],
        Some('A') => vec![PushInput::A],
        _ => Vec::new(),
    }
}

fn report(events: &[Event]) {
    for event in events {
        debug!("{event:?}");
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round-based rule interpreter for Tileworld.
//!
//! A round runs three matching phases (Moving, Resting, Pushing) and a
//! collision pass. Each phase first collects the closures of every rule whose
//! guards hold against the state at the start of the phase and only then
//! executes their commands, so effects become visible to the next phase but
//! never to the phase that produced them. Executing a closure only emits
//! [`WorldCommand`] values, which [`world::apply`] carries out. Nothing reaches
//! the committed world until the round ends with [`WorldCommand::Commit`].

mod collision;
mod executor;
mod guard;
mod matcher;
mod policy;

use log::debug;
use tileworld_core::{
    Event, GameStatus, PushInput, RuleId, RuleRepository, SpriteId, WorldCommand,
};
use tileworld_world::{self as world, query, World, WorldError};

use matcher::RuleSet;
pub use policy::{CoinFlip, ConflictPolicy, KeepFirst, TakeLast};

const DEFAULT_SEED: u64 = 0x7e1e_5eed_0f7a_11ed;

/// Interpreter tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    dirty_filter: bool,
    seed: u64,
}

impl Config {
    /// Creates a configuration.
    ///
    /// With `dirty_filter` off every resting sprite is re-evaluated each
    /// round. `seed` drives the default [`CoinFlip`] policy.
    #[must_use]
    pub const fn new(dirty_filter: bool, seed: u64) -> Self {
        Self { dirty_filter, seed }
    }

    /// Reports whether resting rules are skipped for sprites in unchanged areas.
    #[must_use]
    pub const fn dirty_filter(&self) -> bool {
        self.dirty_filter
    }

    /// Seed of the default conflict policy.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(true, DEFAULT_SEED)
    }
}

/// Matching phases of a round, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Moving,
    Resting,
    Pushing,
}

impl Phase {
    const ORDER: [Phase; 3] = [Phase::Moving, Phase::Resting, Phase::Pushing];
}

/// Rule bound to the sprite it fires for and the witnesses its guards captured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RuleClosure {
    pub(crate) rule: RuleId,
    pub(crate) self_sprite: SpriteId,
    /// Witnesses in discovery order; a collision closure holds only the collider.
    pub(crate) witnesses: Vec<SpriteId>,
}

/// Drives rounds of a world with the rules of a repository.
#[derive(Debug)]
pub struct Interpreter<R, P = CoinFlip> {
    repository: R,
    policy: P,
    config: Config,
    rules: RuleSet,
}

impl<R: RuleRepository> Interpreter<R> {
    /// Creates an interpreter resolving Move conflicts with a seeded coin.
    #[must_use]
    pub fn new(repository: R, config: Config) -> Self {
        Self::with_policy(repository, config, CoinFlip::seeded(config.seed()))
    }
}

impl<R: RuleRepository, P: ConflictPolicy> Interpreter<R, P> {
    /// Creates an interpreter with an explicit conflict policy.
    ///
    /// The repository's rules are read once here; later edits require a new
    /// interpreter.
    #[must_use]
    pub fn with_policy(repository: R, config: Config, policy: P) -> Self {
        let rules = RuleSet::new(&repository);
        Self {
            repository,
            policy,
            config,
            rules,
        }
    }

    /// Rule repository the interpreter reads from.
    #[must_use]
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Configuration the interpreter was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the rule repository.
    #[must_use]
    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Starts a game: follows the player with the camera and runs an empty round.
    pub fn start(
        &mut self,
        world: &mut World,
        out_events: &mut Vec<Event>,
    ) -> Result<GameStatus, WorldError> {
        let _ = world.round_state()?;
        if let Some(sprite) = self
            .repository
            .player()
            .and_then(|player| query::first_sprite_of(world, player))
        {
            out_events.push(Event::CameraFollow { sprite });
        }
        self.round(world, &[], out_events)
    }

    /// Advances the world by one round given the inputs currently pressed.
    ///
    /// A finished game is left untouched.
    pub fn round(
        &mut self,
        world: &mut World,
        pressed: &[PushInput],
        out_events: &mut Vec<Event>,
    ) -> Result<GameStatus, WorldError> {
        let status = world.round_state()?.status();
        if status != GameStatus::InPlay {
            return Ok(status);
        }
        world::apply(world, WorldCommand::BeginRound, out_events);

        let mut executed = 0;
        for phase in Phase::ORDER {
            let closures = self.rules.collect(
                &self.repository,
                world.round_state()?,
                phase,
                pressed,
                self.config.dirty_filter(),
            );
            debug!("{phase:?} phase: {} closures", closures.len());
            if phase == Phase::Resting {
                for closure in &closures {
                    if !self.rules.is_always_true_resting(closure.rule) {
                        world::apply(
                            world,
                            WorldCommand::NoteResting {
                                sprite: closure.self_sprite,
                            },
                            out_events,
                        );
                    }
                }
            }
            executed += self.execute_all(world, &closures, out_events)?;
        }

        let collisions = collision::detect(
            &self.repository,
            self.rules.ordinary(),
            world.round_state()?,
        );
        debug!("collision pass: {} closures", collisions.len());
        executed += self.execute_all(world, &collisions, out_events)?;

        let round = world.round_state()?.round_index();
        world::apply(world, WorldCommand::Commit, out_events);
        out_events.push(Event::RoundCompleted {
            round,
            closures: executed,
        });
        Ok(query::game_status(world))
    }

    /// Executes closures in order, applying the commands of each before the next runs.
    fn execute_all(
        &mut self,
        world: &mut World,
        closures: &[RuleClosure],
        out_events: &mut Vec<Event>,
    ) -> Result<usize, WorldError> {
        let mut commands = Vec::new();
        for closure in closures {
            let Some(rule) = self.repository.rule(closure.rule) else {
                continue;
            };
            executor::execute(
                rule,
                closure,
                world.round_state()?,
                &mut self.policy,
                &mut commands,
            );
            for command in commands.drain(..) {
                world::apply(world, command, out_events);
            }
        }
        Ok(closures.len())
    }
}

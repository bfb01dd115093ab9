#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Tileworld rule engine.
//!
//! The world owns the tile map, the sprite registry and every piece of
//! per-round scratch state: pending moves, the speculative paint buffer, the
//! dead list and the global instruction queue. Systems never write to it
//! directly; they emit [`WorldCommand`] values that [`apply`] carries out.
//! Nothing written during a round becomes visible in the committed state
//! until [`WorldCommand::Commit`] is applied.

mod paint;
mod registry;

use std::{collections::BTreeSet, time::Duration};

use log::{debug, info, trace};
use thiserror::Error;
use tileworld_core::{
    CellCoord, Event, GameArg, GameStatus, GlobalInstruction, Grid, Kind, KindCatalog, MoveArg,
    MoveDirection, Offset, SpriteId, SpriteSnapshot, TileGrid, WorldCommand, DIAMOND_RADIUS,
};

use paint::PaintBuffer;
use registry::{Sprite, SpriteRegistry};

const DEFAULT_TILE_LENGTH: f32 = 16.0;
const DEFAULT_ROUND_PERIOD: Duration = Duration::from_millis(150);
const DEFAULT_PAINT_LOG_CAPACITY: usize = 5;

/// Tunables of the authoritative world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    tile_length: f32,
    round_period: Duration,
    paint_log_capacity: usize,
}

impl Config {
    /// Creates a configuration.
    ///
    /// `round_period` is the time a moving sprite needs to cross one tile.
    /// A `paint_log_capacity` of zero makes every commit scan the whole
    /// paint buffer.
    #[must_use]
    pub const fn new(tile_length: f32, round_period: Duration, paint_log_capacity: usize) -> Self {
        Self {
            tile_length,
            round_period,
            paint_log_capacity,
        }
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Time a moving sprite needs to cross one tile.
    #[must_use]
    pub const fn round_period(&self) -> Duration {
        self.round_period
    }

    /// Number of paints recorded before commit falls back to a full scan.
    #[must_use]
    pub const fn paint_log_capacity(&self) -> usize {
        self.paint_log_capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_TILE_LENGTH,
            DEFAULT_ROUND_PERIOD,
            DEFAULT_PAINT_LOG_CAPACITY,
        )
    }
}

/// Errors reported by the world.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorldError {
    /// A round was requested before any world was set.
    #[error("no world has been set")]
    NotSet,
    /// The tile and sprite layers have different shapes.
    #[error("tile layer is {tiles:?} but sprite layer is {sprites:?}")]
    DimensionMismatch {
        /// Dimensions of the tile layer as `(columns, rows)`.
        tiles: (u32, u32),
        /// Dimensions of the sprite layer as `(columns, rows)`.
        sprites: (u32, u32),
    },
    /// A tile layer cell names a kind that is not fixed.
    #[error("tile at {cell:?} has non-fixed kind {kind:?}")]
    NotFixedKind {
        /// Offending cell.
        cell: CellCoord,
        /// Kind found at the cell.
        kind: Kind,
    },
    /// A sprite layer cell names a kind that is not movable.
    #[error("sprite at {cell:?} has non-movable kind {kind:?}")]
    NotMovableKind {
        /// Offending cell.
        cell: CellCoord,
        /// Kind found at the cell.
        kind: Kind,
    },
}

/// Represents the authoritative Tileworld state.
#[derive(Debug)]
pub struct World {
    config: Config,
    state: Option<RoundState>,
}

impl World {
    /// Creates an empty world; [`set_world`] must run before any round.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Round state of the current world.
    pub fn round_state(&self) -> Result<&RoundState, WorldError> {
        self.state.as_ref().ok_or(WorldError::NotSet)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Replaces the world with the provided tile and sprite layers.
///
/// Sprites are created column by column from the left, top to bottom within
/// a column, each resting at the center of its cell. Every cell starts out
/// changed so the first round considers every resting rule.
pub fn set_world(
    world: &mut World,
    catalog: KindCatalog,
    tiles: Grid<Kind>,
    sprites: Grid<Option<Kind>>,
) -> Result<(), WorldError> {
    if tiles.dimensions() != sprites.dimensions() {
        return Err(WorldError::DimensionMismatch {
            tiles: tiles.dimensions(),
            sprites: sprites.dimensions(),
        });
    }

    for cell in tiles.cells_column_major() {
        if let Some(kind) = tiles.get(cell).copied() {
            if !catalog.is_fixed(kind) {
                return Err(WorldError::NotFixedKind { cell, kind });
            }
        }
    }

    let (columns, rows) = tiles.dimensions();
    let tile_grid = TileGrid::new(columns, rows, world.config.tile_length);
    let mut registry = SpriteRegistry::new(catalog.movable());
    for cell in sprites.cells_column_major() {
        let Some(kind) = sprites.get(cell).copied().flatten() else {
            continue;
        };
        if !catalog.is_movable(kind) {
            return Err(WorldError::NotMovableKind { cell, kind });
        }
        let _ = registry.spawn(kind, tile_grid.center_of(cell));
    }

    info!(
        "world set: {columns}x{rows} tiles, {} sprites",
        registry.iter().count()
    );
    world.state = Some(RoundState {
        catalog,
        tile_grid,
        tiles,
        sprites: registry,
        paint: PaintBuffer::new(columns, rows, world.config.paint_log_capacity),
        changed: Grid::filled(columns, rows, true),
        dead: Vec::new(),
        removed: Vec::new(),
        globals: Vec::new(),
        resting: BTreeSet::new(),
        rested_before: BTreeSet::new(),
        status: GameStatus::InPlay,
        round_index: 0,
    });
    Ok(())
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Commands sent before a world is set are ignored.
pub fn apply(world: &mut World, command: WorldCommand, out_events: &mut Vec<Event>) {
    let Some(state) = world.state.as_mut() else {
        return;
    };
    match command {
        WorldCommand::BeginRound => state.begin_round(),
        WorldCommand::SetPending { sprite, arg } => state.set_pending(sprite, arg),
        WorldCommand::Paint { cell, kind } => {
            if !state.paint(cell, kind) {
                trace!("paint of {cell:?} discarded");
            }
        }
        WorldCommand::MarkDead { sprite } => {
            let _ = state.mark_dead(sprite);
        }
        WorldCommand::QueueGlobal { instruction } => state.globals.push(instruction),
        WorldCommand::NoteResting { sprite } => {
            let _ = state.resting.insert(sprite);
        }
        WorldCommand::Commit => state.commit(out_events),
    }
}

/// Moves every sprite along its committed direction for `dt`.
///
/// Sprites travel one tile per round period and never leave the grid.
pub fn advance(world: &mut World, dt: Duration) {
    let period = world.config.round_period;
    let Some(state) = world.state.as_mut() else {
        return;
    };
    let fraction = if period.is_zero() {
        1.0
    } else {
        dt.as_secs_f32() / period.as_secs_f32()
    };
    let distance = state.tile_grid.tile_length() * fraction;
    let half = state.tile_grid.tile_length() / 2.0;
    let max_x = (state.tile_grid.width() - half).max(half);
    let max_y = (state.tile_grid.height() - half).max(half);

    for sprite in state.sprites.iter_mut() {
        let Some(direction) = sprite.direction else {
            continue;
        };
        let (dx, dy) = direction.delta();
        sprite.position.x = (sprite.position.x + dx as f32 * distance).clamp(half, max_x);
        sprite.position.y = (sprite.position.y + dy as f32 * distance).clamp(half, max_y);
    }
}

/// Committed world plus the scratch state of the round being evaluated.
#[derive(Debug)]
pub struct RoundState {
    catalog: KindCatalog,
    tile_grid: TileGrid,
    tiles: Grid<Kind>,
    sprites: SpriteRegistry,
    paint: PaintBuffer,
    changed: Grid<bool>,
    dead: Vec<SpriteId>,
    removed: Vec<SpriteSnapshot>,
    globals: Vec<GlobalInstruction>,
    resting: BTreeSet<SpriteId>,
    rested_before: BTreeSet<SpriteId>,
    status: GameStatus,
    round_index: u64,
}

impl RoundState {
    /// Kind catalog the world was set with.
    #[must_use]
    pub fn catalog(&self) -> &KindCatalog {
        &self.catalog
    }

    /// Tile layout of the world.
    #[must_use]
    pub fn tile_grid(&self) -> &TileGrid {
        &self.tile_grid
    }

    /// Game status after the last commit.
    #[must_use]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Number of rounds committed so far.
    #[must_use]
    pub fn round_index(&self) -> u64 {
        self.round_index
    }

    fn begin_round(&mut self) {
        let tile_grid = self.tile_grid;
        for sprite in self.sprites.iter_mut() {
            sprite.position = tile_grid.center_of(tile_grid.cell_at(sprite.position));
            sprite.pending = None;
        }
        self.paint.reset();
        self.dead.clear();
        self.removed.clear();
        self.globals.clear();
        self.rested_before = std::mem::take(&mut self.resting);
    }

    /// Sprite identifiers, kind bucket by kind bucket, in insertion order.
    #[must_use]
    pub fn sprite_ids(&self) -> Vec<SpriteId> {
        self.sprites.iter().map(|sprite| sprite.id).collect()
    }

    /// Snapshot of a sprite still in the registry.
    #[must_use]
    pub fn sprite(&self, id: SpriteId) -> Option<SpriteSnapshot> {
        self.sprites.get(id).map(|sprite| self.snapshot(sprite))
    }

    /// Kind of a sprite still in the registry.
    #[must_use]
    pub fn kind_of(&self, id: SpriteId) -> Option<Kind> {
        self.sprites.get(id).map(|sprite| sprite.kind)
    }

    /// Cell occupied by a sprite still in the registry.
    #[must_use]
    pub fn cell_of(&self, id: SpriteId) -> Option<CellCoord> {
        self.sprites
            .get(id)
            .map(|sprite| self.tile_grid.cell_at(sprite.position))
    }

    /// Direction a sprite committed to in the previous round.
    #[must_use]
    pub fn direction(&self, id: SpriteId) -> Option<MoveDirection> {
        self.sprites.get(id).and_then(|sprite| sprite.direction)
    }

    /// Reports whether a rule already removed the sprite this round.
    #[must_use]
    pub fn is_alive(&self, id: SpriteId) -> bool {
        self.sprites.get(id).is_some_and(|sprite| sprite.alive)
    }

    /// Move instruction issued to a sprite so far this round.
    #[must_use]
    pub fn pending(&self, id: SpriteId) -> Option<MoveArg> {
        self.sprites.get(id).and_then(|sprite| sprite.pending)
    }

    /// Reports whether a directional move was issued to the sprite this round.
    #[must_use]
    pub fn is_moving(&self, id: SpriteId) -> bool {
        self.sprites.get(id).is_some_and(Sprite::is_moving)
    }

    /// Direction of the move issued to the sprite this round, if any.
    #[must_use]
    pub fn pending_direction(&self, id: SpriteId) -> Option<MoveDirection> {
        self.pending(id).and_then(MoveArg::direction)
    }

    /// Reports whether the sprite is resting or has not been told to keep moving.
    #[must_use]
    pub fn is_settled(&self, id: SpriteId) -> bool {
        self.sprites
            .get(id)
            .is_some_and(|sprite| sprite.direction.is_none() || !sprite.is_moving())
    }

    /// Tile kind at `cell`, if the cell lies inside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Kind> {
        self.tiles.get(cell).copied()
    }

    /// Reports whether `cell` lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.tiles.contains(cell)
    }

    /// First live sprite of `kind` occupying `cell`, skipping `excluding`.
    #[must_use]
    pub fn live_sprite_at(
        &self,
        kind: Kind,
        cell: CellCoord,
        excluding: Option<SpriteId>,
    ) -> Option<SpriteId> {
        self.sprites.bucket(kind).iter().copied().find(|id| {
            Some(*id) != excluding
                && self.sprites.get(*id).is_some_and(|sprite| {
                    sprite.alive && self.tile_grid.cell_at(sprite.position) == cell
                })
        })
    }

    /// Reports whether any live sprite of `kind` exists.
    #[must_use]
    pub fn any_alive(&self, kind: Kind) -> bool {
        self.sprites
            .bucket(kind)
            .iter()
            .any(|id| self.sprites.get(*id).is_some_and(|sprite| sprite.alive))
    }

    /// Reports whether anything a guard around `cell` can see may differ from
    /// the last time it was evaluated.
    ///
    /// That is the case when the previous commit changed a cell of the diamond
    /// or a sprite inside it was removed earlier this round.
    #[must_use]
    pub fn changed_near(&self, cell: CellCoord) -> bool {
        let changed = Offset::ALL.iter().any(|offset| {
            cell.at_offset(*offset)
                .and_then(|target| self.changed.get(target).copied())
                .unwrap_or(false)
        });
        changed
            || self.dead.iter().any(|id| {
                self.cell_of(*id).is_some_and(|dead| {
                    dead.manhattan_distance(cell) <= u32::from(DIAMOND_RADIUS)
                })
            })
    }

    /// Reports whether a resting rule fired for the sprite in the previous round.
    #[must_use]
    pub fn rested_last_round(&self, id: SpriteId) -> bool {
        self.rested_before.contains(&id)
    }

    fn set_pending(&mut self, id: SpriteId, arg: MoveArg) {
        if let Some(sprite) = self.sprites.get_mut(id) {
            sprite.pending = Some(arg);
        }
    }

    fn paint(&mut self, cell: CellCoord, kind: Kind) -> bool {
        self.paint.paint(cell, kind)
    }

    fn mark_dead(&mut self, id: SpriteId) -> bool {
        let Some(sprite) = self.sprites.get_mut(id) else {
            return false;
        };
        if !sprite.alive {
            return false;
        }
        sprite.alive = false;
        self.dead.push(id);
        true
    }

    /// Pending moves become directions, paints are written to the tile map,
    /// global instructions run in queue order and removed sprites leave the
    /// registry. Every touched cell is recorded in the changed map.
    fn commit(&mut self, out_events: &mut Vec<Event>) {
        self.changed.fill(false);

        let tile_grid = self.tile_grid;
        let mut moving = Vec::new();
        for sprite in self.sprites.iter_mut() {
            if !sprite.alive {
                continue;
            }
            sprite.direction = sprite.resolved_direction();
            if let Some(direction) = sprite.direction {
                moving.push((sprite.id, tile_grid.cell_at(sprite.position), direction));
            }
        }
        moving.sort_by_key(|(id, _, _)| *id);
        for (sprite, from, direction) in moving {
            self.changed.set(from, true);
            if let Some(to) = from.step(direction) {
                self.changed.set(to, true);
            }
            out_events.push(Event::SpriteMoving {
                sprite,
                from,
                direction,
            });
        }

        for (cell, kind) in self.paint.drain() {
            self.tiles.set(cell, kind);
            self.changed.set(cell, true);
            out_events.push(Event::TilePainted { cell, kind });
        }

        let previous = self.status;
        self.run_globals();

        for id in std::mem::take(&mut self.dead) {
            let Some(sprite) = self.sprites.remove(id) else {
                continue;
            };
            let snapshot = self.snapshot(&sprite);
            self.changed.set(snapshot.cell, true);
            out_events.push(Event::SpriteRemoved {
                sprite: snapshot.id,
                kind: snapshot.kind,
                cell: snapshot.cell,
            });
            self.removed.push(snapshot);
        }

        if self.status != previous {
            info!("game status changed to {:?}", self.status);
            out_events.push(Event::GameStatusChanged {
                status: self.status,
            });
        }

        debug!(
            "round {} committed: {} removed",
            self.round_index,
            self.removed.len()
        );
        self.round_index = self.round_index.saturating_add(1);
    }

    fn run_globals(&mut self) {
        let globals = std::mem::take(&mut self.globals);
        let mut instructions = globals.iter();
        while let Some(instruction) = instructions.next() {
            match *instruction {
                GlobalInstruction::Game(GameArg::Win) => self.status = GameStatus::Won,
                GlobalInstruction::Game(GameArg::Lose) => self.status = GameStatus::Lost,
                GlobalInstruction::SpritePred(kind) => {
                    if self.any_alive(kind) {
                        let _ = instructions.next();
                    }
                }
            }
        }
    }

    fn snapshot(&self, sprite: &Sprite) -> SpriteSnapshot {
        SpriteSnapshot {
            id: sprite.id,
            kind: sprite.kind,
            cell: self.tile_grid.cell_at(sprite.position),
            position: sprite.position,
            direction: sprite.direction,
            alive: sprite.alive,
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use tileworld_core::{CellCoord, GameStatus, Grid, Kind, SpriteId, SpriteSnapshot, SpriteView, TileGrid};

    use super::World;

    /// Game status after the last commit; an unset world is still in play.
    #[must_use]
    pub fn game_status(world: &World) -> GameStatus {
        world
            .state
            .as_ref()
            .map_or(GameStatus::InPlay, |state| state.status)
    }

    /// Provides read-only access to the world's tile grid definition.
    #[must_use]
    pub fn tile_grid(world: &World) -> Option<&TileGrid> {
        world.state.as_ref().map(|state| &state.tile_grid)
    }

    /// Committed tile map.
    #[must_use]
    pub fn tiles(world: &World) -> Option<&Grid<Kind>> {
        world.state.as_ref().map(|state| &state.tiles)
    }

    /// Cells changed by the last commit.
    #[must_use]
    pub fn changed(world: &World) -> Option<&Grid<bool>> {
        world.state.as_ref().map(|state| &state.changed)
    }

    /// Reports whether the last commit changed `cell`.
    #[must_use]
    pub fn is_changed(world: &World, cell: CellCoord) -> bool {
        changed(world).and_then(|grid| grid.get(cell)).copied().unwrap_or(false)
    }

    /// Captures a read-only view of the sprites in the registry.
    #[must_use]
    pub fn sprite_view(world: &World) -> SpriteView {
        let snapshots = world.state.as_ref().map_or_else(Vec::new, |state| {
            state
                .sprites
                .iter()
                .map(|sprite| state.snapshot(sprite))
                .collect()
        });
        SpriteView::from_snapshots(snapshots)
    }

    /// Sprites removed by the last commit, in removal order.
    #[must_use]
    pub fn dead_sprites(world: &World) -> &[SpriteSnapshot] {
        world
            .state
            .as_ref()
            .map(|state| state.removed.as_slice())
            .unwrap_or_default()
    }

    /// First sprite of `kind` in registry order.
    #[must_use]
    pub fn first_sprite_of(world: &World, kind: Kind) -> Option<SpriteId> {
        world
            .state
            .as_ref()
            .and_then(|state| state.sprites.bucket(kind).first().copied())
    }

    /// Number of rounds committed so far.
    #[must_use]
    pub fn round_index(world: &World) -> u64 {
        world.state.as_ref().map_or(0, |state| state.round_index)
    }
}

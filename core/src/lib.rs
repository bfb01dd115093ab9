#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tileworld rule engine.
//!
//! This crate defines the vocabulary that connects the authoring side, the
//! authoritative world and the interpreter. Rules are expressed against a
//! [`KindCatalog`] and reached through the [`RuleRepository`] trait, the world
//! exposes immutable [`SpriteView`] snapshots, and every committed round is
//! broadcast as a batch of [`Event`] values for adapters to react to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod neighborhood;
pub mod rules;

pub use neighborhood::{Offset, OffsetError, DIAMOND_CELLS, DIAMOND_RADIUS};
pub use rules::{
    Attribute, Command, GameArg, GlobalInstruction, MoveArg, PushInput, Rule, RuleId,
    RuleRepository, RuleType, SpriteArg, WhenDo, COMMAND_SLOTS,
};

/// Category of a tile or sprite, indexing the combined kind catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Kind(u16);

impl Kind {
    /// Creates a kind from its position in the combined catalog.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the kind.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Position of the kind in the combined catalog.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Ordered catalog of kinds: fixed (tile) kinds first, then movable (sprite) kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindCatalog {
    fixed: u16,
    movable: u16,
}

impl KindCatalog {
    /// Creates a catalog with the provided number of fixed and movable kinds.
    #[must_use]
    pub const fn new(fixed: u16, movable: u16) -> Self {
        Self { fixed, movable }
    }

    /// Number of fixed kinds.
    #[must_use]
    pub const fn fixed_count(&self) -> usize {
        self.fixed as usize
    }

    /// Number of movable kinds.
    #[must_use]
    pub const fn movable_count(&self) -> usize {
        self.movable as usize
    }

    /// Total number of kinds.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fixed as usize + self.movable as usize
    }

    /// Reports whether the catalog is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports whether `kind` is a fixed (tile) kind.
    #[must_use]
    pub const fn is_fixed(&self, kind: Kind) -> bool {
        kind.0 < self.fixed
    }

    /// Reports whether `kind` is a movable (sprite) kind.
    #[must_use]
    pub const fn is_movable(&self, kind: Kind) -> bool {
        kind.0 >= self.fixed && kind.0 - self.fixed < self.movable
    }

    /// Fixed kinds in catalog order.
    pub fn fixed(&self) -> impl Iterator<Item = Kind> {
        (0..self.fixed).map(Kind)
    }

    /// Movable kinds in catalog order.
    pub fn movable(&self) -> impl Iterator<Item = Kind> {
        (self.fixed..self.fixed + self.movable).map(Kind)
    }

    /// Every kind in catalog order.
    pub fn all(&self) -> impl Iterator<Item = Kind> {
        (0..self.fixed + self.movable).map(Kind)
    }

    /// Movable kind at `index` counted from the first movable kind.
    #[must_use]
    pub fn movable_kind(&self, index: u16) -> Option<Kind> {
        (index < self.movable).then(|| Kind(self.fixed + index))
    }
}

/// Unique identifier assigned to a sprite by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(u32);

impl SpriteId {
    /// Creates a new sprite identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Cardinal directions a sprite may move in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveDirection {
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
}

impl MoveDirection {
    /// All directions in declaration order.
    pub const ALL: [MoveDirection; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    /// Column and row displacement of a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Up => (0, -1),
            Self::Down => (0, 1),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Direction after a quarter turn counter-clockwise on screen.
    #[must_use]
    pub const fn rotate_left(self) -> Self {
        match self {
            Self::Left => Self::Down,
            Self::Right => Self::Up,
            Self::Up => Self::Left,
            Self::Down => Self::Right,
        }
    }

    /// Direction after a quarter turn clockwise on screen.
    #[must_use]
    pub const fn rotate_right(self) -> Self {
        match self {
            Self::Left => Self::Up,
            Self::Right => Self::Down,
            Self::Up => Self::Right,
            Self::Down => Self::Left,
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Cell displaced by the provided amounts, if it has non-negative coordinates.
    #[must_use]
    pub fn shifted(self, dx: i32, dy: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }

    /// Cell at `offset` from this one, if it has non-negative coordinates.
    #[must_use]
    pub fn at_offset(self, offset: Offset) -> Option<CellCoord> {
        self.shifted(i32::from(offset.dx()), i32::from(offset.dy()))
    }

    /// Neighboring cell reached by one step in `direction`.
    #[must_use]
    pub fn step(self, direction: MoveDirection) -> Option<CellCoord> {
        let (dx, dy) = direction.delta();
        self.shifted(dx, dy)
    }
}

/// Continuous position of a sprite's center measured in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate growing to the right.
    pub x: f32,
    /// Vertical coordinate growing downward.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Describes the discrete tile layout of the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileGrid {
    columns: u32,
    rows: u32,
    tile_length: f32,
}

impl TileGrid {
    /// Creates a new tile grid description.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, tile_length: f32) -> Self {
        Self {
            columns,
            rows,
            tile_length,
        }
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_length
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_length
    }

    /// Center of `cell` in world units.
    #[must_use]
    pub fn center_of(&self, cell: CellCoord) -> Position {
        let half = self.tile_length / 2.0;
        Position::new(
            cell.column() as f32 * self.tile_length + half,
            cell.row() as f32 * self.tile_length + half,
        )
    }

    /// Cell containing `position`, clamped onto the grid.
    #[must_use]
    pub fn cell_at(&self, position: Position) -> CellCoord {
        let clamp = |value: f32, count: u32| -> u32 {
            if count == 0 || self.tile_length <= 0.0 {
                return 0;
            }
            let index = (value / self.tile_length).floor();
            if index <= 0.0 {
                0
            } else {
                (index as u32).min(count - 1)
            }
        };
        CellCoord::new(clamp(position.x, self.columns), clamp(position.y, self.rows))
    }
}

/// Errors raised while assembling a [`Grid`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// A row differs in length from the first row.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Number of cells in the first row.
        expected: usize,
        /// Number of cells in the offending row.
        found: usize,
    },
}

/// Dense rectangular layer of cells stored in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid<T> {
    columns: u32,
    rows: u32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every cell set to `value`.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, value: T) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![value; capacity],
        }
    }

    /// Builds a grid from rows of equal length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let expected = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(expected * rows.len());
        for (row, values) in rows.iter().enumerate() {
            if values.len() != expected {
                return Err(GridError::Ragged {
                    row,
                    expected,
                    found: values.len(),
                });
            }
            cells.extend(values.iter().cloned());
        }
        Ok(Self {
            columns: u32::try_from(expected).unwrap_or(u32::MAX),
            rows: u32::try_from(rows.len()).unwrap_or(u32::MAX),
            cells,
        })
    }

    /// Overwrites every cell with `value`.
    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }
}

impl<T> Grid<T> {
    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Provides the dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether `cell` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Value stored at `cell`, if it lies inside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<&T> {
        self.index(cell).and_then(|index| self.cells.get(index))
    }

    /// Mutable value stored at `cell`, if it lies inside the grid.
    pub fn get_mut(&mut self, cell: CellCoord) -> Option<&mut T> {
        self.index(cell).and_then(|index| self.cells.get_mut(index))
    }

    /// Stores `value` at `cell`; cells outside the grid are ignored.
    pub fn set(&mut self, cell: CellCoord, value: T) {
        if let Some(slot) = self.get_mut(cell) {
            *slot = value;
        }
    }

    /// Every cell coordinate, column by column from the left.
    pub fn cells_column_major(&self) -> impl Iterator<Item = CellCoord> {
        let rows = self.rows;
        (0..self.columns).flat_map(move |column| (0..rows).map(move |row| CellCoord::new(column, row)))
    }

    /// Every cell coordinate, row by row from the top.
    pub fn cells_row_major(&self) -> impl Iterator<Item = CellCoord> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Overall outcome of the game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// The game is still running.
    #[default]
    InPlay,
    /// A rule declared the game won.
    Won,
    /// A rule declared the game lost.
    Lost,
}

/// Immutable representation of a single sprite's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteSnapshot {
    /// Unique identifier assigned to the sprite.
    pub id: SpriteId,
    /// Movable kind of the sprite.
    pub kind: Kind,
    /// Grid cell currently occupied by the sprite.
    pub cell: CellCoord,
    /// Continuous position of the sprite's center.
    pub position: Position,
    /// Direction committed by the last round, if the sprite is moving.
    pub direction: Option<MoveDirection>,
    /// Indicates whether the sprite is still part of the world.
    pub alive: bool,
}

/// Read-only snapshot describing all sprites within the world.
#[derive(Clone, Debug, Default)]
pub struct SpriteView {
    snapshots: Vec<SpriteSnapshot>,
}

impl SpriteView {
    /// Creates a new sprite view from snapshots already in registry order.
    #[must_use]
    pub fn from_snapshots(snapshots: Vec<SpriteSnapshot>) -> Self {
        Self { snapshots }
    }

    /// Iterator over the captured sprite snapshots in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the sprite with the provided identifier.
    #[must_use]
    pub fn get(&self, id: SpriteId) -> Option<&SpriteSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.id == id)
    }

    /// Number of sprites captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no sprites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<SpriteSnapshot> {
        self.snapshots
    }
}

/// Events broadcast while a round is evaluated and committed.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Asks the presentation layer to keep the sprite in view.
    CameraFollow {
        /// Sprite the camera should track.
        sprite: SpriteId,
    },
    /// Confirms that a sprite set off toward a neighboring cell.
    SpriteMoving {
        /// Identifier of the moving sprite.
        sprite: SpriteId,
        /// Cell the sprite leaves.
        from: CellCoord,
        /// Direction of travel.
        direction: MoveDirection,
    },
    /// Confirms that a tile was repainted.
    TilePainted {
        /// Cell whose tile changed.
        cell: CellCoord,
        /// Fixed kind now shown at the cell.
        kind: Kind,
    },
    /// Confirms that a sprite was removed from the world.
    SpriteRemoved {
        /// Identifier of the removed sprite.
        sprite: SpriteId,
        /// Kind of the removed sprite.
        kind: Kind,
        /// Cell the sprite occupied when it was removed.
        cell: CellCoord,
    },
    /// Announces a change of the game status.
    GameStatusChanged {
        /// Status after the round.
        status: GameStatus,
    },
    /// Marks the end of a round.
    RoundCompleted {
        /// Zero-based index of the completed round.
        round: u64,
        /// Number of rule closures whose commands were executed.
        closures: usize,
    },
}

/// Round mutations requested by the interpreter and carried out by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldCommand {
    /// Opens a round: snaps sprites to tile centers and clears the round's scratch state.
    BeginRound,
    /// Replaces the move a sprite will commit to.
    SetPending {
        /// Sprite receiving the move.
        sprite: SpriteId,
        /// Move to commit.
        arg: MoveArg,
    },
    /// Paints a cell of the next tile map unless it was already painted this round.
    Paint {
        /// Cell to repaint.
        cell: CellCoord,
        /// Fixed kind to show at the cell.
        kind: Kind,
    },
    /// Removes a sprite at commit, hiding it from the rest of the round.
    MarkDead {
        /// Sprite to remove.
        sprite: SpriteId,
    },
    /// Queues a game-level instruction for commit.
    QueueGlobal {
        /// Instruction to run at commit.
        instruction: GlobalInstruction,
    },
    /// Records that a resting rule fired for the sprite this round.
    NoteResting {
        /// Sprite the resting rule fired for.
        sprite: SpriteId,
    },
    /// Applies every pending effect of the round to the committed world.
    Commit,
}

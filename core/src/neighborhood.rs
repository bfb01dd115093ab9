//! Diamond-shaped guard neighborhood surrounding a sprite.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MoveDirection;

/// Largest Manhattan distance a guard position may lie from the center.
pub const DIAMOND_RADIUS: u8 = 2;

/// Number of cells within [`DIAMOND_RADIUS`] of the center, center included.
pub const DIAMOND_CELLS: usize = 13;

// Cells preceding each column of the diamond, indexed by `dx + 2`.
const COLUMN_STARTS: [usize; 5] = [0, 1, 4, 9, 12];

/// Reasons an offset may be rejected when constructing a neighborhood position.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OffsetError {
    /// The offset lies further than [`DIAMOND_RADIUS`] from the center.
    #[error("offset ({dx}, {dy}) lies outside the guard diamond")]
    OutsideDiamond {
        /// Requested column displacement.
        dx: i8,
        /// Requested row displacement.
        dy: i8,
    },
}

/// Position inside the guard diamond, relative to the sprite at its center.
///
/// Construction is validated so that every value satisfies
/// `|dx| + |dy| <= DIAMOND_RADIUS`; rules index their per-position payloads
/// with [`Offset::index`] and never see an out-of-diamond key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "(i8, i8)", into = "(i8, i8)")]
pub struct Offset {
    dx: i8,
    dy: i8,
}

impl Offset {
    /// The sprite's own cell.
    pub const CENTER: Offset = Offset::raw(0, 0);

    /// Every diamond position, column-major from the leftmost column.
    ///
    /// Guards are evaluated and witnesses discovered in this order.
    pub const ALL: [Offset; DIAMOND_CELLS] = [
        Offset::raw(-2, 0),
        Offset::raw(-1, -1),
        Offset::raw(-1, 0),
        Offset::raw(-1, 1),
        Offset::raw(0, -2),
        Offset::raw(0, -1),
        Offset::raw(0, 0),
        Offset::raw(0, 1),
        Offset::raw(0, 2),
        Offset::raw(1, -1),
        Offset::raw(1, 0),
        Offset::raw(1, 1),
        Offset::raw(2, 0),
    ];

    const fn raw(dx: i8, dy: i8) -> Self {
        Self { dx, dy }
    }

    /// Creates a validated offset.
    pub fn new(dx: i8, dy: i8) -> Result<Self, OffsetError> {
        let distance = dx.unsigned_abs().saturating_add(dy.unsigned_abs());
        if distance > DIAMOND_RADIUS {
            return Err(OffsetError::OutsideDiamond { dx, dy });
        }
        Ok(Self::raw(dx, dy))
    }

    /// Offset of the neighboring cell reached by one step in `direction`.
    #[must_use]
    pub const fn toward(direction: MoveDirection) -> Self {
        let (dx, dy) = direction.delta();
        Self::raw(dx as i8, dy as i8)
    }

    /// Column displacement from the center.
    #[must_use]
    pub const fn dx(&self) -> i8 {
        self.dx
    }

    /// Row displacement from the center.
    #[must_use]
    pub const fn dy(&self) -> i8 {
        self.dy
    }

    /// Manhattan distance from the center.
    #[must_use]
    pub const fn distance(&self) -> u8 {
        self.dx.unsigned_abs() + self.dy.unsigned_abs()
    }

    /// Reports whether the offset denotes the center cell.
    #[must_use]
    pub const fn is_center(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Reports whether the offset is the center or one of its four neighbors.
    #[must_use]
    pub const fn is_adjacent(&self) -> bool {
        self.distance() <= 1
    }

    /// Dense slot of the offset within [`Offset::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        let reach = (DIAMOND_RADIUS - self.dx.unsigned_abs()) as i8;
        let column = (self.dx + 2) as usize;
        COLUMN_STARTS[column] + (self.dy + reach) as usize
    }
}

impl TryFrom<(i8, i8)> for Offset {
    type Error = OffsetError;

    fn try_from((dx, dy): (i8, i8)) -> Result<Self, Self::Error> {
        Self::new(dx, dy)
    }
}

impl From<Offset> for (i8, i8) {
    fn from(offset: Offset) -> Self {
        (offset.dx, offset.dy)
    }
}

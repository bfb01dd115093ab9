//! Text rendering of the committed world.

use tileworld_core::CellCoord;
use tileworld_world::{query, World};

use crate::scenario::Palette;

/// Draws the tile layer with live sprites on top, one line per row.
///
/// Returns `None` before a world has been set.
pub(crate) fn grid(world: &World, palette: &Palette) -> Option<String> {
    let tiles = query::tiles(world)?;
    let (columns, rows) = tiles.dimensions();
    let mut lines: Vec<Vec<char>> = (0..rows)
        .map(|row| {
            (0..columns)
                .map(|column| {
                    tiles
                        .get(CellCoord::new(column, row))
                        .and_then(|kind| palette.glyph(*kind))
                        .unwrap_or('?')
                })
                .collect()
        })
        .collect();

    for sprite in query::sprite_view(world).iter() {
        let Some(glyph) = palette.glyph(sprite.kind) else {
            continue;
        };
        if let Some(cell) = lines
            .get_mut(sprite.cell.row() as usize)
            .and_then(|line| line.get_mut(sprite.cell.column() as usize))
        {
            *cell = glyph;
        }
    }

    Some(
        lines
            .into_iter()
            .map(|line| line.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

//! Speculative tile buffer collecting the paint commands of a round.

use tileworld_core::{CellCoord, Grid, Kind};

#[derive(Clone, Debug, PartialEq, Eq)]
enum PaintLog {
    Bounded(Vec<(CellCoord, Kind)>),
    Overflowed,
}

/// Next-world layer plus a short log of the cells written to it.
///
/// The first paint of a cell wins. Once more cells are painted than the log
/// holds, commit falls back to scanning the whole layer.
#[derive(Clone, Debug)]
pub(crate) struct PaintBuffer {
    next: Grid<Option<Kind>>,
    log: PaintLog,
    capacity: usize,
}

impl PaintBuffer {
    pub(crate) fn new(columns: u32, rows: u32, capacity: usize) -> Self {
        Self {
            next: Grid::filled(columns, rows, None),
            log: PaintLog::Bounded(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Forgets every paint of the previous round.
    pub(crate) fn reset(&mut self) {
        self.next.fill(None);
        self.log = PaintLog::Bounded(Vec::with_capacity(self.capacity));
    }

    /// Records a paint unless the cell is off the grid or already painted.
    pub(crate) fn paint(&mut self, cell: CellCoord, kind: Kind) -> bool {
        let Some(slot) = self.next.get_mut(cell) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(kind);
        if let PaintLog::Bounded(entries) = &mut self.log {
            if entries.len() < self.capacity {
                entries.push((cell, kind));
            } else {
                self.log = PaintLog::Overflowed;
            }
        }
        true
    }

    /// Paints to apply at commit, from the log or from a full scan.
    pub(crate) fn drain(&mut self) -> Vec<(CellCoord, Kind)> {
        let painted = match std::mem::replace(&mut self.log, PaintLog::Overflowed) {
            PaintLog::Bounded(entries) => entries,
            PaintLog::Overflowed => self
                .next
                .cells_column_major()
                .filter_map(|cell| self.next.get(cell).copied().flatten().map(|kind| (cell, kind)))
                .collect(),
        };
        self.reset();
        painted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let mut buffer = PaintBuffer::new(3, 3, 5);
        let cell = CellCoord::new(1, 1);
        assert!(buffer.paint(cell, Kind::new(0)));
        assert!(!buffer.paint(cell, Kind::new(1)));
        assert_eq!(buffer.drain(), vec![(cell, Kind::new(0))]);
    }

    #[test]
    fn off_grid_paint_is_ignored() {
        let mut buffer = PaintBuffer::new(2, 2, 5);
        assert!(!buffer.paint(CellCoord::new(2, 0), Kind::new(0)));
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn overflow_falls_back_to_full_scan() {
        let mut logged = PaintBuffer::new(4, 1, 5);
        let mut scanned = PaintBuffer::new(4, 1, 2);
        for column in [3, 0, 2] {
            let cell = CellCoord::new(column, 0);
            let _ = logged.paint(cell, Kind::new(column as u16));
            let _ = scanned.paint(cell, Kind::new(column as u16));
        }
        let mut from_log = logged.drain();
        from_log.sort();
        assert_eq!(scanned.drain(), from_log);
        assert!(scanned.drain().is_empty());
    }
}

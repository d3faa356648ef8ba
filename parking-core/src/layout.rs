use std::collections::BTreeSet;

use crate::error::GridError;
use crate::grid::{COLS, CellState, Position, ROWS};

/// Static shape of the lot: dimensions, entry cell, and the fixed
/// obstacle and path sets. Everything else starts out empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    rows: usize,
    cols: usize,
    start: Position,
    obstacles: BTreeSet<Position>,
    paths: BTreeSet<Position>,
}

impl Default for Layout {
    fn default() -> Self {
        Layout::standard()
    }
}

impl Layout {
    /// The 20x15 lot: a T-shaped interior wall and a drivable ring.
    pub fn standard() -> Self {
        let mut obstacles = BTreeSet::new();
        // vertical wall
        for r in 1..19 {
            obstacles.insert(Position::new(r, 7));
        }
        // horizontal wall
        for c in 1..14 {
            obstacles.insert(Position::new(8, c));
        }

        let mut paths = BTreeSet::new();
        for c in 1..COLS {
            paths.insert(Position::new(0, c));
            paths.insert(Position::new(ROWS - 1, c));
        }
        for r in 1..ROWS {
            paths.insert(Position::new(r, 0));
            paths.insert(Position::new(r, COLS - 1));
        }

        Layout {
            rows: ROWS,
            cols: COLS,
            start: Position::new(0, 0),
            obstacles,
            paths,
        }
    }

    /// Builds a custom layout, rejecting any coordinate outside the grid.
    pub fn new(
        rows: usize,
        cols: usize,
        start: Position,
        obstacles: impl IntoIterator<Item = Position>,
        paths: impl IntoIterator<Item = Position>,
    ) -> Result<Self, GridError> {
        let check = |pos: Position| {
            if pos.row >= rows || pos.col >= cols {
                Err(GridError::OutOfBounds { pos, rows, cols })
            } else {
                Ok(pos)
            }
        };
        check(start)?;
        let obstacles = obstacles
            .into_iter()
            .map(check)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let paths = paths
            .into_iter()
            .map(check)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Layout {
            rows,
            cols,
            start,
            obstacles,
            paths,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn obstacles(&self) -> &BTreeSet<Position> {
        &self.obstacles
    }

    pub fn paths(&self) -> &BTreeSet<Position> {
        &self.paths
    }

    /// Initial state of a cell. Precedence: start, obstacle, path, empty.
    pub fn classify(&self, pos: Position) -> Result<CellState, GridError> {
        if pos.row >= self.rows || pos.col >= self.cols {
            return Err(GridError::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self.classify_unchecked(pos))
    }

    pub(crate) fn classify_unchecked(&self, pos: Position) -> CellState {
        if pos == self.start {
            CellState::Start
        } else if self.obstacles.contains(&pos) {
            CellState::Obstacle
        } else if self.paths.contains(&pos) {
            CellState::Path
        } else {
            CellState::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(layout: &Layout, state: CellState) -> usize {
        (0..ROWS)
            .flat_map(|r| (0..COLS).map(move |c| Position::new(r, c)))
            .filter(|&p| layout.classify(p) == Ok(state))
            .count()
    }

    #[test]
    fn standard_layout_counts() {
        let l = Layout::standard();
        assert_eq!(count(&l, CellState::Start), 1);
        assert_eq!(count(&l, CellState::Obstacle), 30);
        assert_eq!(count(&l, CellState::Path), 65);
        assert_eq!(count(&l, CellState::Empty), 204);
        assert_eq!(l.obstacles().len(), 30);
        assert_eq!(l.paths().len(), 65);
    }

    #[test]
    fn standard_layout_rules() {
        let l = Layout::standard();
        for r in 0..ROWS {
            for c in 0..COLS {
                let expected = if (r, c) == (0, 0) {
                    CellState::Start
                } else if (c == 7 && (1..=18).contains(&r)) || (r == 8 && (1..=13).contains(&c)) {
                    CellState::Obstacle
                } else if r == 0 || r == ROWS - 1 || c == 0 || c == COLS - 1 {
                    CellState::Path
                } else {
                    CellState::Empty
                };
                assert_eq!(l.classify(Position::new(r, c)), Ok(expected), "cell ({r}, {c})");
            }
        }
    }

    #[test]
    fn obstacle_wins_over_path() {
        let shared = Position::new(1, 1);
        let l = Layout::new(3, 3, Position::new(0, 0), [shared], [shared, Position::new(0, 1)])
            .unwrap();
        assert_eq!(l.classify(shared), Ok(CellState::Obstacle));
        assert_eq!(l.classify(Position::new(0, 1)), Ok(CellState::Path));
        assert_eq!(l.classify(Position::new(2, 2)), Ok(CellState::Empty));
    }

    #[test]
    fn start_wins_over_everything() {
        let start = Position::new(1, 1);
        let l = Layout::new(2, 2, start, [start], [start]).unwrap();
        assert_eq!(l.classify(start), Ok(CellState::Start));
    }

    #[test]
    fn custom_layout_rejects_out_of_bounds() {
        assert!(Layout::new(2, 2, Position::new(0, 0), [Position::new(2, 0)], Vec::<Position>::new()).is_err());
        assert!(Layout::new(2, 2, Position::new(5, 5), Vec::<Position>::new(), Vec::<Position>::new()).is_err());
        assert!(Layout::standard().classify(Position::new(ROWS, 0)).is_err());
    }
}

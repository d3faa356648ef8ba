use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::layout::Layout;

/// Lot height in cells.
pub const ROWS: usize = 20;
/// Lot width in cells.
pub const COLS: usize = 15;

/// Grid coordinate. Serialized as `[row, col]`, the shape the backend uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl From<(usize, usize)> for Position {
    fn from(v: (usize, usize)) -> Self {
        Position { row: v.0, col: v.1 }
    }
}

impl From<[usize; 2]> for Position {
    fn from(v: [usize; 2]) -> Self {
        Position { row: v[0], col: v[1] }
    }
}

impl From<Position> for [usize; 2] {
    fn from(p: Position) -> Self {
        [p.row, p.col]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Start,
    Obstacle,
    Path,
    Empty,
    Occupied,
}

impl CellState {
    /// CSS-style class name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            CellState::Start => "start",
            CellState::Obstacle => "obstacle",
            CellState::Path => "path",
            CellState::Empty => "empty",
            CellState::Occupied => "occupied",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub state: CellState,
    /// Present iff `state == Occupied`.
    pub plate: Option<String>,
}

/// Row-major matrix of cells seeded from a [`Layout`].
///
/// Only `Empty <-> Occupied` transitions are allowed once the grid exists;
/// start, obstacle and path cells keep the state the layout gave them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    start: Position,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(layout: &Layout) -> Self {
        let mut cells = Vec::with_capacity(layout.rows() * layout.cols());
        for row in 0..layout.rows() {
            for col in 0..layout.cols() {
                cells.push(Cell {
                    state: layout.classify_unchecked(Position::new(row, col)),
                    plate: None,
                });
            }
        }
        Grid {
            rows: layout.rows(),
            cols: layout.cols(),
            start: layout.start(),
            cells,
        }
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

    fn index(&self, pos: Position) -> Result<usize, GridError> {
        if pos.row >= self.rows || pos.col >= self.cols {
            return Err(GridError::OutOfBounds {
                pos,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(pos.row * self.cols + pos.col)
    }

    pub fn state_at(&self, pos: Position) -> Result<CellState, GridError> {
        let i = self.index(pos)?;
        Ok(self.cells[i].state)
    }

    pub fn plate_at(&self, pos: Position) -> Result<Option<&str>, GridError> {
        let i = self.index(pos)?;
        Ok(self.cells[i].plate.as_deref())
    }

    pub fn set_occupied(&mut self, pos: Position, plate: &str) -> Result<(), GridError> {
        let i = self.index(pos)?;
        let cell = &mut self.cells[i];
        if cell.state != CellState::Empty {
            return Err(GridError::InvalidTransition {
                pos,
                from: cell.state,
                to: CellState::Occupied,
            });
        }
        cell.state = CellState::Occupied;
        cell.plate = Some(plate.to_string());
        Ok(())
    }

    /// Frees an occupied cell and hands back the plate that was parked there.
    pub fn clear(&mut self, pos: Position) -> Result<String, GridError> {
        let i = self.index(pos)?;
        let cell = &mut self.cells[i];
        if cell.state != CellState::Occupied {
            return Err(GridError::InvalidTransition {
                pos,
                from: cell.state,
                to: CellState::Empty,
            });
        }
        cell.state = CellState::Empty;
        Ok(cell.plate.take().unwrap_or_default())
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (Position::new(i / cols, i % cols), c))
    }

    pub fn first_empty(&self) -> Option<Position> {
        self.cells()
            .find(|(_, c)| c.state == CellState::Empty)
            .map(|(p, _)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(&Layout::standard())
    }

    #[test]
    fn park_then_clear_leaves_no_plate() {
        let mut g = grid();
        let pos = Position::new(5, 5);
        g.set_occupied(pos, "XYZ111").unwrap();
        assert_eq!(g.state_at(pos), Ok(CellState::Occupied));
        assert_eq!(g.plate_at(pos), Ok(Some("XYZ111")));

        assert_eq!(g.clear(pos).unwrap(), "XYZ111");
        assert_eq!(g.state_at(pos), Ok(CellState::Empty));
        assert_eq!(g.plate_at(pos), Ok(None));
        assert_eq!(g, grid());
    }

    #[test]
    fn start_cell_cannot_be_occupied() {
        let mut g = grid();
        for plate in ["", "ABC123", "  "] {
            let err = g.set_occupied(Position::new(0, 0), plate).unwrap_err();
            assert!(matches!(
                err,
                GridError::InvalidTransition {
                    from: CellState::Start,
                    ..
                }
            ));
        }
        assert_eq!(g, grid());
    }

    #[test]
    fn occupied_cell_cannot_be_parked_twice() {
        let mut g = grid();
        let pos = Position::new(2, 3);
        g.set_occupied(pos, "A").unwrap();
        let before = g.clone();
        assert!(g.set_occupied(pos, "B").is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn clear_requires_occupied() {
        let mut g = grid();
        for pos in [(0, 0), (1, 7), (0, 3), (2, 2)] {
            assert!(matches!(
                g.clear(pos.into()),
                Err(GridError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut g = grid();
        let pos = Position::new(ROWS, 0);
        assert_eq!(
            g.state_at(pos),
            Err(GridError::OutOfBounds {
                pos,
                rows: ROWS,
                cols: COLS
            })
        );
        assert!(g.set_occupied(Position::new(0, COLS), "A").is_err());
        assert!(g.clear(Position::new(99, 99)).is_err());
    }

    #[test]
    fn first_empty_scans_row_major() {
        let mut g = grid();
        assert_eq!(g.first_empty(), Some(Position::new(1, 1)));
        g.set_occupied(Position::new(1, 1), "A").unwrap();
        assert_eq!(g.first_empty(), Some(Position::new(1, 2)));
    }

    #[test]
    fn position_serializes_as_pair() {
        let json = serde_json::to_string(&Position::new(3, 9)).unwrap();
        assert_eq!(json, "[3,9]");
        let back: Position = serde_json::from_str("[4, 2]").unwrap();
        assert_eq!(back, Position::new(4, 2));
    }
}

use serde::Serialize;

use crate::grid::{CellState, Grid};

/// Dashboard counters derived from a full scan of the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LotStatus {
    pub total: usize,
    pub occupied: usize,
    pub available: usize,
    pub obstacles: usize,
    /// Whole percent, rounded half up.
    pub occupancy_rate: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OccupancyLevel {
    Low,
    Medium,
    High,
}

impl OccupancyLevel {
    pub fn color(self) -> &'static str {
        match self {
            OccupancyLevel::Low => "#2ecc71",
            OccupancyLevel::Medium => "#f39c12",
            OccupancyLevel::High => "#e74c3c",
        }
    }
}

impl LotStatus {
    pub fn level(&self) -> OccupancyLevel {
        match self.occupancy_rate {
            r if r > 80 => OccupancyLevel::High,
            r if r > 50 => OccupancyLevel::Medium,
            _ => OccupancyLevel::Low,
        }
    }
}

/// Paths count towards `total` but never towards `available`.
pub fn compute_status(grid: &Grid) -> LotStatus {
    let (mut total, mut occupied, mut obstacles, mut paths) = (0, 0, 0, 0);
    for (_, cell) in grid.cells() {
        match cell.state {
            CellState::Start => {}
            CellState::Obstacle => obstacles += 1,
            CellState::Path => {
                total += 1;
                paths += 1;
            }
            CellState::Empty => total += 1,
            CellState::Occupied => {
                total += 1;
                occupied += 1;
            }
        }
    }
    let occupancy_rate = if total > 0 {
        (occupied as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };
    LotStatus {
        total,
        occupied,
        available: total.saturating_sub(occupied + paths),
        obstacles,
        occupancy_rate,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grid::Position;
    use crate::layout::Layout;

    #[test]
    fn fresh_lot() {
        let grid = Grid::new(&Layout::standard());
        assert_eq!(
            compute_status(&grid),
            LotStatus {
                total: 269,
                occupied: 0,
                available: 204,
                obstacles: 30,
                occupancy_rate: 0,
            }
        );
    }

    #[test]
    fn park_and_remove_restores_status() {
        let mut grid = Grid::new(&Layout::standard());
        let before = compute_status(&grid);

        grid.set_occupied(Position::new(5, 5), "XYZ111").unwrap();
        let parked = compute_status(&grid);
        assert_eq!(parked.occupied, before.occupied + 1);
        assert_eq!(parked.available, before.available - 1);
        assert_eq!(parked.total, before.total);

        grid.clear(Position::new(5, 5)).unwrap();
        assert_eq!(compute_status(&grid), before);
    }

    #[test]
    fn rate_rounds_to_nearest_percent() {
        let layout = Layout::new(1, 8, Position::new(0, 0), Vec::<Position>::new(), Vec::<Position>::new())
            .unwrap();
        let mut grid = Grid::new(&layout);
        // 7 spots: 1/7 = 14.28 -> 14, 4/7 = 57.14 -> 57
        grid.set_occupied(Position::new(0, 1), "A").unwrap();
        assert_eq!(compute_status(&grid).occupancy_rate, 14);
        for c in 2..5 {
            grid.set_occupied(Position::new(0, c), "A").unwrap();
        }
        let status = compute_status(&grid);
        assert_eq!(status.occupancy_rate, 57);
        assert_eq!(status.level(), OccupancyLevel::Medium);
    }

    #[test]
    fn empty_lot_has_zero_rate() {
        let layout = Layout::new(1, 1, Position::new(0, 0), Vec::<Position>::new(), Vec::<Position>::new())
            .unwrap();
        let status = compute_status(&Grid::new(&layout));
        assert_eq!(status.total, 0);
        assert_eq!(status.occupancy_rate, 0);
    }

    #[test]
    fn levels() {
        let at = |rate| LotStatus {
            occupancy_rate: rate,
            ..Default::default()
        };
        assert_eq!(at(50).level(), OccupancyLevel::Low);
        assert_eq!(at(51).level(), OccupancyLevel::Medium);
        assert_eq!(at(80).level(), OccupancyLevel::Medium);
        assert_eq!(at(81).level(), OccupancyLevel::High);
        assert_eq!(OccupancyLevel::High.color(), "#e74c3c");
    }
}

//! Grid geometry: cells, cardinal directions, and cell/world mapping.
//!
//! The logistics network lives on a 2D integer grid. Each cell holds at most
//! one port. World coordinates exist only so parcels can carry a display
//! position; all simulation logic is cell-based.

use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// A position on the 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step in `dir`.
    pub fn step(&self, dir: Direction) -> Cell {
        let (dx, dy) = dir.offset();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbors, in `Direction::ALL` order.
    pub fn neighbors(&self) -> [Cell; 4] {
        [
            self.step(Direction::North),
            self.step(Direction::East),
            self.step(Direction::South),
            self.step(Direction::West),
        ]
    }

    /// Direction from `self` toward an orthogonally adjacent `other`.
    /// Returns `None` for non-adjacent or diagonal cells.
    pub fn direction_to(&self, other: Cell) -> Option<Direction> {
        let (dx, dy) = (other.x - self.x, other.y - self.y);
        match (dx, dy) {
            (0, 1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, -1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    /// Chebyshev (chessboard) distance to another cell.
    pub fn chebyshev_distance(&self, other: Cell) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
    }
}

// ---------------------------------------------------------------------------
// Direction / Axis
// ---------------------------------------------------------------------------

/// A cardinal direction on the grid. Y grows northward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit cell offset for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// 90 degrees clockwise.
    pub fn right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// 90 degrees counter-clockwise.
    pub fn left(self) -> Direction {
        self.right().opposite()
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::North | Direction::South => Axis::NorthSouth,
            Direction::East | Direction::West => Axis::EastWest,
        }
    }

    /// Stable index 0..4, used for lane arrays.
    pub fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }
}

/// One of the two grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    NorthSouth,
    EastWest,
}

impl Axis {
    pub fn perpendicular(self) -> Axis {
        match self {
            Axis::NorthSouth => Axis::EastWest,
            Axis::EastWest => Axis::NorthSouth,
        }
    }
}

// ---------------------------------------------------------------------------
// World mapping (display only)
// ---------------------------------------------------------------------------

/// A continuous world position. Display/interpolation only; never feeds back
/// into queue or capacity logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl WorldPos {
    pub const ZERO: WorldPos = WorldPos {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
    };
}

/// Center of a cell in world coordinates.
pub fn cell_to_world(cell: Cell) -> WorldPos {
    let half = Fixed64::from_num(1) >> 1;
    WorldPos {
        x: Fixed64::from_num(cell.x) + half,
        y: Fixed64::from_num(cell.y) + half,
    }
}

/// The cell containing a world position.
pub fn world_to_cell(pos: WorldPos) -> Cell {
    Cell::new(
        pos.x.floor().to_num::<i32>(),
        pos.y.floor().to_num::<i32>(),
    )
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_and_direction_to_are_inverse() {
        let c = Cell::new(3, -2);
        for dir in Direction::ALL {
            let n = c.step(dir);
            assert_eq!(c.direction_to(n), Some(dir));
            assert_eq!(n.direction_to(c), Some(dir.opposite()));
        }
    }

    #[test]
    fn direction_to_rejects_diagonal_and_distant() {
        let c = Cell::new(0, 0);
        assert_eq!(c.direction_to(Cell::new(1, 1)), None);
        assert_eq!(c.direction_to(Cell::new(0, 2)), None);
        assert_eq!(c.direction_to(c), None);
    }

    #[test]
    fn rotation_algebra() {
        for dir in Direction::ALL {
            assert_eq!(dir.right().right(), dir.opposite());
            assert_eq!(dir.left(), dir.right().opposite());
            assert_eq!(dir.right().left(), dir);
        }
    }

    #[test]
    fn axis_perpendicular() {
        assert_eq!(Direction::North.axis(), Axis::NorthSouth);
        assert_eq!(Direction::East.axis(), Axis::EastWest);
        assert_eq!(Axis::NorthSouth.perpendicular(), Axis::EastWest);
    }

    #[test]
    fn world_round_trip() {
        for cell in [Cell::new(0, 0), Cell::new(-5, 17), Cell::new(40, -3)] {
            assert_eq!(world_to_cell(cell_to_world(cell)), cell);
        }
    }

    #[test]
    fn chebyshev_distance_basics() {
        let a = Cell::new(0, 0);
        assert_eq!(a.chebyshev_distance(Cell::new(3, -4)), 4);
        assert_eq!(a.chebyshev_distance(a), 0);
    }
}

//! Power coverage provider for the Beltline engine.
//!
//! Models power as a set of square coverage areas with a shared per-tick
//! supply. A cell is powered when any area covers it; powered belts draw
//! from the supply each tick, and once the supply is exhausted the
//! remaining draws fail and those belts fall back to their powerless speed.
//!
//! # Design
//!
//! - Coverage is geometric: an area covers every cell within a Chebyshev
//!   radius of its center (a square, matching grid placement footprints).
//! - Supply is a single pool replenished at the top of every tick, so draw
//!   order (chain order) decides who browns out under shortage.
//! - Each area carries a speed multiplier; overlapping areas contribute the
//!   best one. The engine applies it on top of the powered speed.

use beltline_core::fixed::Fixed64;
use beltline_core::grid::Cell;
use beltline_core::power::PowerService;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coverage areas
// ---------------------------------------------------------------------------

/// A square power coverage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageArea {
    pub center: Cell,
    /// Chebyshev radius: covers all cells within this many steps.
    pub radius: u32,
    /// Speed factor granted to powered belts inside this area.
    pub multiplier: Fixed64,
}

impl CoverageArea {
    pub fn new(center: Cell, radius: u32) -> Self {
        Self {
            center,
            radius,
            multiplier: Fixed64::ONE,
        }
    }

    pub fn with_multiplier(mut self, multiplier: Fixed64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn covers(&self, cell: Cell) -> bool {
        self.center.chebyshev_distance(cell) <= self.radius
    }
}

// ---------------------------------------------------------------------------
// Coverage grid
// ---------------------------------------------------------------------------

/// A [`PowerService`] backed by coverage areas and a shared per-tick supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageGrid {
    areas: Vec<CoverageArea>,
    /// Total power available per tick across all covered consumers.
    supply_per_tick: Fixed64,
    consumed: Fixed64,
}

impl CoverageGrid {
    pub fn new(supply_per_tick: Fixed64) -> Self {
        Self {
            areas: Vec::new(),
            supply_per_tick,
            consumed: Fixed64::ZERO,
        }
    }

    pub fn add_area(&mut self, area: CoverageArea) {
        self.areas.push(area);
    }

    pub fn areas(&self) -> &[CoverageArea] {
        &self.areas
    }

    /// Power drawn so far this tick.
    pub fn consumed(&self) -> Fixed64 {
        self.consumed
    }

    pub fn remaining(&self) -> Fixed64 {
        self.supply_per_tick - self.consumed
    }
}

impl PowerService for CoverageGrid {
    fn begin_tick(&mut self) {
        self.consumed = Fixed64::ZERO;
    }

    fn is_cell_powered(&self, cell: Cell) -> bool {
        self.areas.iter().any(|a| a.covers(cell))
    }

    fn speed_multiplier(&self, cell: Cell) -> Fixed64 {
        self.areas
            .iter()
            .filter(|a| a.covers(cell))
            .map(|a| a.multiplier)
            .max()
            .unwrap_or(Fixed64::ONE)
    }

    fn try_consume_power(&mut self, _cell: Cell, amount: Fixed64) -> bool {
        if self.consumed + amount > self.supply_per_tick {
            return false;
        }
        self.consumed += amount;
        true
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use beltline_core::test_utils::fixed;

    // -----------------------------------------------------------------------
    // Test 1: coverage is a Chebyshev square
    // -----------------------------------------------------------------------
    #[test]
    fn coverage_is_square() {
        let area = CoverageArea::new(Cell::new(0, 0), 2);
        assert!(area.covers(Cell::new(2, 2)));
        assert!(area.covers(Cell::new(-2, 1)));
        assert!(!area.covers(Cell::new(3, 0)));
    }

    // -----------------------------------------------------------------------
    // Test 2: supply replenishes each tick and refuses over-draw
    // -----------------------------------------------------------------------
    #[test]
    fn supply_pool_per_tick() {
        let mut grid = CoverageGrid::new(fixed(10.0));
        grid.add_area(CoverageArea::new(Cell::new(0, 0), 5));
        let cell = Cell::new(1, 1);

        grid.begin_tick();
        assert!(grid.try_consume_power(cell, fixed(6.0)));
        assert!(!grid.try_consume_power(cell, fixed(6.0)));
        assert!(grid.try_consume_power(cell, fixed(4.0)));
        assert_eq!(grid.remaining(), Fixed64::ZERO);

        grid.begin_tick();
        assert!(grid.try_consume_power(cell, fixed(6.0)));
    }

    // -----------------------------------------------------------------------
    // Test 3: overlapping areas grant the best multiplier
    // -----------------------------------------------------------------------
    #[test]
    fn best_multiplier_wins() {
        let mut grid = CoverageGrid::new(fixed(10.0));
        grid.add_area(CoverageArea::new(Cell::new(0, 0), 3));
        grid.add_area(CoverageArea::new(Cell::new(0, 0), 1).with_multiplier(fixed(2.0)));
        assert_eq!(grid.speed_multiplier(Cell::new(0, 0)), fixed(2.0));
        assert_eq!(grid.speed_multiplier(Cell::new(3, 0)), Fixed64::ONE);
        assert!(!grid.is_cell_powered(Cell::new(4, 0)));
        assert_eq!(grid.speed_multiplier(Cell::new(4, 0)), Fixed64::ONE);
    }
}

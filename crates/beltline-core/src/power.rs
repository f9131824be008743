//! Power coverage seam.
//!
//! The network never computes coverage itself; it asks an injected
//! `PowerService` once per tick per powered segment. Coverage plus a
//! successful draw selects the powered Move speed, anything else falls back
//! to the powerless one. This only modulates the Move-phase speed, queue
//! and capacity logic are untouched.

use crate::fixed::Fixed64;
use crate::grid::Cell;

pub trait PowerService {
    /// Called once at the top of every simulation step, before any draw.
    fn begin_tick(&mut self) {}

    /// Whether this cell sits inside any coverage area.
    fn is_cell_powered(&self, cell: Cell) -> bool;

    /// Speed factor applied on top of the powered speed, 1.0 when the
    /// provider has no notion of graded coverage.
    fn speed_multiplier(&self, _cell: Cell) -> Fixed64 {
        Fixed64::ONE
    }

    /// Attempt to draw `amount` from this tick's supply. A refusal leaves
    /// the supply untouched.
    fn try_consume_power(&mut self, cell: Cell, amount: Fixed64) -> bool;
}

/// Default provider: nothing is powered. Powered belt variants run at their
/// powerless speed under it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPower;

impl PowerService for NoPower {
    fn is_cell_powered(&self, _cell: Cell) -> bool {
        false
    }

    fn try_consume_power(&mut self, _cell: Cell, _amount: Fixed64) -> bool {
        false
    }
}

//! Fractional throughput accounting for routing components.
//!
//! A budget accrues `rate * dt` per tick and spends whole units only, so a
//! component rated at 2.5 items/sec alternates between 2 and 3 items across
//! ticks instead of rounding every tick the same way. Fractional remainder
//! carries across ticks while the component has work it cannot finish;
//! an idle component keeps only the fraction, preventing a burst after a
//! long quiet stretch.

use crate::fixed::{Fixed64, Seconds, whole_units};

#[derive(Debug, Clone, Copy)]
pub struct ThroughputBudget {
    rate: Fixed64,
    accrued: Fixed64,
}

impl ThroughputBudget {
    pub fn new(rate: Fixed64) -> Self {
        Self {
            rate,
            accrued: Fixed64::ZERO,
        }
    }

    pub fn rate(&self) -> Fixed64 {
        self.rate
    }

    /// Credit this tick's allotment.
    pub fn accrue(&mut self, dt: Seconds) {
        self.accrued += self.rate * dt;
    }

    /// Whole units available to spend right now.
    pub fn quota(&self) -> u32 {
        whole_units(self.accrued)
    }

    /// Consume one unit. Callers check `quota()` first.
    pub fn spend(&mut self) {
        debug_assert!(self.quota() > 0);
        self.accrued -= Fixed64::ONE;
    }

    /// Drop the whole part, keeping the fraction. Called when the component
    /// had nothing to do this tick, so unused whole units do not pile up.
    pub fn discard_whole(&mut self) {
        self.accrued = self.accrued.frac();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Distributor: a single-cell buffer that fans items out round-robin across
//! its forward, right, and left exits.
//!
//! The rotation pointer only advances past an exit that actually took an
//! item, so a blocked side never consumes a turn and throughput shifts to
//! the exits that are open.

use crate::budget::ThroughputBudget;
use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction, cell_to_world};
use crate::item::ItemParcel;
use crate::port::{ItemPort, PortClass};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct Distributor {
    cell: Cell,
    facing: Direction,
    queue: VecDeque<ItemParcel>,
    capacity: usize,
    rr_index: usize,
    budget: ThroughputBudget,
}

impl Distributor {
    pub fn new(cell: Cell, facing: Direction, capacity: usize, rate: Fixed64) -> Self {
        Self {
            cell,
            facing,
            queue: VecDeque::new(),
            capacity,
            rr_index: 0,
            budget: ThroughputBudget::new(rate),
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Exit rotation order: forward, right, left of facing.
    pub fn exits(&self) -> [Direction; 3] {
        [self.facing, self.facing.right(), self.facing.left()]
    }

    /// Exits starting at the rotation pointer, in the order they should be
    /// offered an item this attempt.
    pub fn exit_rotation(&self) -> [Direction; 3] {
        let exits = self.exits();
        [
            exits[self.rr_index % 3],
            exits[(self.rr_index + 1) % 3],
            exits[(self.rr_index + 2) % 3],
        ]
    }

    /// Move the pointer one past the exit (by rotation offset) that accepted.
    pub fn advance_rotation(&mut self, accepted_offset: usize) {
        self.rr_index = (self.rr_index + accepted_offset + 1) % 3;
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn peek(&self) -> Option<&ItemParcel> {
        self.queue.front()
    }

    pub fn budget(&self) -> &ThroughputBudget {
        &self.budget
    }

    pub fn budget_mut(&mut self) -> &mut ThroughputBudget {
        &mut self.budget
    }
}

impl ItemPort for Distributor {
    fn can_receive(&self, _parcel: &ItemParcel) -> bool {
        self.queue.len() < self.capacity
    }

    fn can_provide(&self) -> bool {
        !self.queue.is_empty()
    }

    fn try_receive(&mut self, mut parcel: ItemParcel) -> bool {
        if self.queue.len() >= self.capacity {
            return false;
        }
        parcel.display_position = cell_to_world(self.cell);
        self.queue.push_back(parcel);
        true
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        self.queue.pop_front()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Crosser: a four-way intersection that carries items straight through.
//!
//! The incoming side is inferred from the sender's cell (carried on the
//! parcel's display position), not from a declared port direction, so two
//! perpendicular belt runs can share the cell without tangling. Each egress
//! direction gets its own lane; total occupancy is bounded by one shared
//! capacity and a rotating pointer keeps lane service fair.

use crate::budget::ThroughputBudget;
use crate::fixed::Fixed64;
use crate::grid::{Axis, Cell, Direction, cell_to_world, world_to_cell};
use crate::item::ItemParcel;
use crate::port::ItemPort;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct Crosser {
    cell: Cell,
    main_axis: Axis,
    lanes: [VecDeque<ItemParcel>; 4],
    capacity: usize,
    rr_lane: usize,
    budget: ThroughputBudget,
}

impl Crosser {
    pub fn new(cell: Cell, main_axis: Axis, capacity: usize, rate: Fixed64) -> Self {
        Self {
            cell,
            main_axis,
            lanes: Default::default(),
            capacity,
            rr_lane: 0,
            budget: ThroughputBudget::new(rate),
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn main_axis(&self) -> Axis {
        self.main_axis
    }

    /// Egress direction an arriving parcel would continue in, judged from
    /// the sender cell stamped on it. Non-adjacent or diagonal senders have
    /// no legal lane.
    fn infer_egress(&self, parcel: &ItemParcel) -> Option<Direction> {
        let sender = world_to_cell(parcel.display_position);
        sender.direction_to(self.cell)
    }

    pub fn total_queued(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    pub fn lane_len(&self, dir: Direction) -> usize {
        self.lanes[dir.index()].len()
    }

    pub fn peek_lane(&self, dir: Direction) -> Option<&ItemParcel> {
        self.lanes[dir.index()].front()
    }

    pub fn pop_lane(&mut self, dir: Direction) -> Option<ItemParcel> {
        self.lanes[dir.index()].pop_front()
    }

    /// The four egress directions starting at the rotation pointer.
    pub fn lane_rotation(&self) -> [Direction; 4] {
        let mut out = [Direction::North; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = Direction::ALL[(self.rr_lane + i) % 4];
        }
        out
    }

    /// Move the pointer one past the lane (by rotation offset) that egressed.
    pub fn advance_lane(&mut self, accepted_offset: usize) {
        self.rr_lane = (self.rr_lane + accepted_offset + 1) % 4;
    }

    pub fn budget(&self) -> &ThroughputBudget {
        &self.budget
    }

    pub fn budget_mut(&mut self) -> &mut ThroughputBudget {
        &mut self.budget
    }
}

impl ItemPort for Crosser {
    fn can_receive(&self, parcel: &ItemParcel) -> bool {
        self.total_queued() < self.capacity && self.infer_egress(parcel).is_some()
    }

    fn can_provide(&self) -> bool {
        self.total_queued() > 0
    }

    fn try_receive(&mut self, mut parcel: ItemParcel) -> bool {
        if self.total_queued() >= self.capacity {
            return false;
        }
        let Some(egress) = self.infer_egress(&parcel) else {
            return false;
        };
        parcel.display_position = cell_to_world(self.cell);
        self.lanes[egress.index()].push_back(parcel);
        true
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        // Pull service drains lanes in rotation order.
        for offset in 0..4 {
            let dir = Direction::ALL[(self.rr_lane + offset) % 4];
            if let Some(parcel) = self.lanes[dir.index()].pop_front() {
                self.advance_lane(offset);
                return Some(parcel);
            }
        }
        None
    }
}

// ===========================================================================
// Tests
// ===========================================================================

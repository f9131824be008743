//! Filter: whitelist routing with an explicit reject path.
//!
//! Matching items queue in the primary lane and leave through the normal
//! output. Mismatched items, in non-blocking mode, queue in a bounded
//! reject lane serviced ahead of the primary one; what happens to them is
//! the reject policy's call.

use crate::budget::ThroughputBudget;
use crate::fixed::Fixed64;
use crate::grid::{Cell, Direction, cell_to_world};
use crate::id::ItemTypeId;
use crate::item::ItemParcel;
use crate::port::ItemPort;
use std::collections::VecDeque;

/// What to do with items the whitelist rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Push back out the reverse of the intake direction.
    BounceBack,
    /// Push out the normal output direction, unfiltered.
    PassThrough,
    /// Discard silently. Also accepts mismatches when the reject lane is
    /// full instead of failing the receive.
    Drop,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Item type the primary lane carries. `None` with `permissive` set
    /// means everything matches; `None` without it means nothing does.
    pub allow: Option<ItemTypeId>,
    pub permissive: bool,
    /// Accept mismatches into the reject lane instead of failing receive.
    pub non_blocking: bool,
    pub policy: RejectPolicy,
    pub primary_capacity: usize,
    pub reject_capacity: usize,
    pub rate: Fixed64,
}

#[derive(Debug)]
pub struct Filter {
    cell: Cell,
    facing: Direction,
    config: FilterConfig,
    primary: VecDeque<ItemParcel>,
    reject: VecDeque<ItemParcel>,
    budget: ThroughputBudget,
    discarded: u64,
    active: bool,
}

impl Filter {
    pub fn new(cell: Cell, facing: Direction, config: FilterConfig) -> Self {
        let budget = ThroughputBudget::new(config.rate);
        Self {
            cell,
            facing,
            config,
            primary: VecDeque::new(),
            reject: VecDeque::new(),
            budget,
            discarded: 0,
            active: true,
        }
    }

    /// Retire the filter permanently. An inactive filter refuses every
    /// parcel and is skipped by routing; used when its configured item
    /// type is not defined in the registry.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn policy(&self) -> RejectPolicy {
        self.config.policy
    }

    fn matches(&self, parcel: &ItemParcel) -> bool {
        match self.config.allow {
            Some(t) => parcel.item_type == t,
            None => self.config.permissive,
        }
    }

    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    pub fn reject_len(&self) -> usize {
        self.reject.len()
    }

    pub fn is_idle(&self) -> bool {
        self.primary.is_empty() && self.reject.is_empty()
    }

    pub fn peek_primary(&self) -> Option<&ItemParcel> {
        self.primary.front()
    }

    pub fn peek_reject(&self) -> Option<&ItemParcel> {
        self.reject.front()
    }

    pub fn pop_primary(&mut self) -> Option<ItemParcel> {
        self.primary.pop_front()
    }

    pub fn pop_reject(&mut self) -> Option<ItemParcel> {
        self.reject.pop_front()
    }

    pub fn push_front_reject(&mut self, parcel: ItemParcel) {
        self.reject.push_front(parcel);
    }

    /// Where serviced reject items go. `None` means they are dropped.
    pub fn reject_egress_dir(&self) -> Option<Direction> {
        match self.config.policy {
            RejectPolicy::BounceBack => Some(self.facing.opposite()),
            RejectPolicy::PassThrough => Some(self.facing),
            RejectPolicy::Drop => None,
        }
    }

    pub fn budget(&self) -> &ThroughputBudget {
        &self.budget
    }

    pub fn budget_mut(&mut self) -> &mut ThroughputBudget {
        &mut self.budget
    }

    pub fn record_discard(&mut self, quantity: u32) {
        self.discarded += u64::from(quantity);
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl ItemPort for Filter {
    fn can_receive(&self, parcel: &ItemParcel) -> bool {
        if !self.active {
            false
        } else if self.matches(parcel) {
            self.primary.len() < self.config.primary_capacity
        } else if !self.config.non_blocking {
            false
        } else {
            self.reject.len() < self.config.reject_capacity
                || self.config.policy == RejectPolicy::Drop
        }
    }

    fn can_provide(&self) -> bool {
        !self.primary.is_empty()
    }

    fn try_receive(&mut self, mut parcel: ItemParcel) -> bool {
        if !self.active {
            return false;
        }
        parcel.display_position = cell_to_world(self.cell);
        if self.matches(&parcel) {
            if self.primary.len() >= self.config.primary_capacity {
                return false;
            }
            self.primary.push_back(parcel);
            return true;
        }
        if !self.config.non_blocking {
            return false;
        }
        if self.reject.len() < self.config.reject_capacity {
            self.reject.push_back(parcel);
            return true;
        }
        // Full reject lane: swallow only when the policy discards anyway.
        if self.config.policy == RejectPolicy::Drop {
            self.record_discard(parcel.quantity);
            return true;
        }
        false
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        self.primary.pop_front()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Belt segments: ordered queues of parcels with continuous positions.
//!
//! A segment occupies one grid cell and moves items along `[0, 1)` toward
//! its exit. Stepping is split into two externally invoked phases:
//!
//! - **Move** advances every item by `speed * dt`, clamped so no item closes
//!   to less than `min_spacing` behind the item ahead, and so the head only
//!   reaches 1.0 when the downstream can currently accept a handoff.
//! - **Transfer** examines only the head item; the network orchestrates the
//!   actual handoff because it touches two nodes at once.
//!
//! With zero speed Move is a no-op but Transfer still runs, so an item that
//! already reached the exit can leave an unpowered belt.

use crate::connect::ConnectionCache;
use crate::fixed::{head_epsilon, Fixed64, Seconds};
use crate::grid::{Cell, Direction};
use crate::id::ParcelIdAlloc;
use crate::item::{BeltItem, ItemParcel};
use crate::port::{ItemPort, PortClass, TransitNode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable belt parameters, fixed at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltConfig {
    /// Maximum number of items on the segment.
    pub capacity: u32,
    /// Minimum gap between adjacent items, in travel-axis units.
    pub min_spacing: Fixed64,
    /// Travel speed in traversals per second.
    pub speed: Fixed64,
    /// Power-linked speed modulation, for powered belt variants.
    pub power: Option<PowerProfile>,
}

impl BeltConfig {
    /// A plain belt: no power profile.
    pub fn plain(capacity: u32, min_spacing: Fixed64, speed: Fixed64) -> Self {
        Self {
            capacity,
            min_spacing,
            speed,
            power: None,
        }
    }
}

/// Speed pair for power-linked belts. Pure numeric modulation of the Move
/// phase; queue and capacity logic are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerProfile {
    /// Speed while covered and the power draw succeeds.
    pub powered_speed: Fixed64,
    /// Fallback speed, often zero.
    pub powerless_speed: Fixed64,
    /// Power drawn per in-transit item per tick.
    pub draw_per_item: Fixed64,
}

// ---------------------------------------------------------------------------
// BeltSegment
// ---------------------------------------------------------------------------

/// A single conveyor cell. Items are ordered head-first: `items[0]` is the
/// most advanced (nearest the exit).
#[derive(Debug)]
pub struct BeltSegment {
    cell: Cell,
    in_dir: Direction,
    out_dir: Direction,
    config: BeltConfig,
    items: VecDeque<BeltItem>,
    connection: Option<ConnectionCache>,
    ids: ParcelIdAlloc,
    // Move context for the current tick, set by the network before the
    // Move phase barrier.
    effective_speed: Fixed64,
    exit_open: bool,
}

impl BeltSegment {
    /// Create a segment facing `out_dir`; the input defaults to the back.
    pub fn new(cell: Cell, facing: Direction, config: BeltConfig, ids: ParcelIdAlloc) -> Self {
        let effective_speed = config.speed;
        Self {
            cell,
            in_dir: facing.opposite(),
            out_dir: facing,
            config,
            items: VecDeque::new(),
            connection: None,
            ids,
            effective_speed,
            exit_open: false,
        }
    }

    pub fn config(&self) -> &BeltConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &BeltItem> {
        self.items.iter()
    }

    /// Position of the most advanced item, if any.
    pub fn head_position(&self) -> Option<Fixed64> {
        self.items.front().map(|i| i.position)
    }

    /// Position of the least advanced item, if any.
    pub fn tail_position(&self) -> Option<Fixed64> {
        self.items.back().map(|i| i.position)
    }

    pub fn head(&self) -> Option<&BeltItem> {
        self.items.front()
    }

    /// Whether the head item has completed its traversal.
    pub fn head_ready(&self) -> bool {
        self.head_position()
            .is_some_and(|p| p >= Fixed64::from_num(1) - head_epsilon())
    }

    // -----------------------------------------------------------------------
    // Direction fields
    // -----------------------------------------------------------------------

    pub fn set_in_dir(&mut self, dir: Direction) {
        self.in_dir = dir;
    }

    /// Rotate the output. Invalidates the cached connection if it pointed
    /// elsewhere.
    pub fn set_out_dir(&mut self, dir: Direction) {
        if self.out_dir != dir {
            self.out_dir = dir;
            self.connection = None;
        }
    }

    pub fn connection(&self) -> Option<ConnectionCache> {
        self.connection
    }

    pub fn set_connection(&mut self, cache: Option<ConnectionCache>) {
        self.connection = cache;
    }

    // -----------------------------------------------------------------------
    // Geometry handoff (belt-to-belt, no port call)
    // -----------------------------------------------------------------------

    /// Whether a new item fits at the entry end: below capacity, and the
    /// tail item (if any) has cleared `min_spacing`.
    pub fn can_accept_item(&self) -> bool {
        if self.items.len() as u32 >= self.config.capacity {
            return false;
        }
        match self.tail_position() {
            Some(tail) => tail >= self.config.min_spacing,
            None => true,
        }
    }

    /// Place an item at the entry end. The caller must have checked
    /// `can_accept_item`; the item's position resets to 0.
    pub fn accept_item(&mut self, mut item: BeltItem) {
        debug_assert!(self.can_accept_item());
        item.position = Fixed64::ZERO;
        self.items.push_back(item);
    }

    /// Remove and return the head item once it has completed traversal.
    pub fn take_head(&mut self) -> Option<BeltItem> {
        if self.head_ready() {
            self.items.pop_front()
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Move phase
    // -----------------------------------------------------------------------

    /// Set this tick's move context: the power-resolved speed and whether
    /// the downstream can currently accept a full-traversal handoff.
    pub fn set_move_context(&mut self, speed: Fixed64, exit_open: bool) {
        self.effective_speed = speed;
        self.exit_open = exit_open;
    }

    /// The speed the last Move phase ran at (after power modulation).
    pub fn effective_speed(&self) -> Fixed64 {
        self.effective_speed
    }
}

impl TransitNode for BeltSegment {
    fn cell(&self) -> Cell {
        self.cell
    }

    fn in_dir(&self) -> Direction {
        self.in_dir
    }

    fn out_dir(&self) -> Direction {
        self.out_dir
    }

    fn step_move(&mut self, dt: Seconds) {
        let advance = self.effective_speed * dt;
        if advance <= Fixed64::ZERO {
            return;
        }
        let one = Fixed64::from_num(1);
        // Head clamp: the exit, or a spacing gap short of it when the
        // downstream cannot take a handoff right now.
        let mut limit = if self.exit_open {
            one
        } else {
            one - self.config.min_spacing
        };
        for item in &mut self.items {
            let target = (item.position + advance).min(limit);
            if target > item.position {
                item.position = target;
            }
            limit = item.position - self.config.min_spacing;
        }
    }
}

impl ItemPort for BeltSegment {
    fn can_receive(&self, _parcel: &ItemParcel) -> bool {
        self.can_accept_item()
    }

    fn can_provide(&self) -> bool {
        self.head_ready()
    }

    fn try_receive(&mut self, parcel: ItemParcel) -> bool {
        if !self.can_accept_item() {
            return false;
        }
        let item = BeltItem::new(parcel, self.ids.next_id());
        self.items.push_back(item);
        true
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        self.take_head().map(|item| item.parcel)
    }

    fn port_class(&self) -> PortClass {
        PortClass::Conveyor
    }

    fn declared_input_dir(&self) -> Option<Direction> {
        Some(self.in_dir)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fx;
    use crate::id::ItemTypeId;

    fn test_belt(speed: f64) -> BeltSegment {
        BeltSegment::new(
            Cell::new(0, 0),
            Direction::East,
            BeltConfig::plain(3, fx(0.3), fx(speed)),
            ParcelIdAlloc::new(),
        )
    }

    fn parcel() -> ItemParcel {
        ItemParcel::new(ItemTypeId(0))
    }

    // -----------------------------------------------------------------------
    // Test 1: items enter at position 0 and advance with each Move
    // -----------------------------------------------------------------------
    #[test]
    fn items_enter_at_zero_and_advance() {
        let mut belt = test_belt(1.0);
        assert!(belt.try_receive(parcel()));
        assert_eq!(belt.head_position(), Some(Fixed64::ZERO));

        belt.set_move_context(fx(1.0), false);
        belt.step_move(fx(0.25));
        assert_eq!(belt.head_position(), Some(fx(0.25)));
    }

    // -----------------------------------------------------------------------
    // Test 2: head clamps short of the exit while the gate is closed
    // -----------------------------------------------------------------------
    #[test]
    fn head_clamps_when_exit_closed() {
        let mut belt = test_belt(1.0);
        belt.try_receive(parcel());
        belt.set_move_context(fx(1.0), false);
        belt.step_move(fx(5.0));
        assert_eq!(belt.head_position(), Some(fx(0.7)));
        assert!(!belt.head_ready());

        // Opening the gate lets the head complete traversal.
        belt.set_move_context(fx(1.0), true);
        belt.step_move(fx(5.0));
        assert_eq!(belt.head_position(), Some(fx(1.0)));
        assert!(belt.head_ready());
    }

    // -----------------------------------------------------------------------
    // Test 3: followers respect min spacing behind the item ahead
    // -----------------------------------------------------------------------
    #[test]
    fn followers_keep_min_spacing() {
        let mut belt = test_belt(1.0);
        belt.try_receive(parcel());
        belt.set_move_context(fx(1.0), false);
        belt.step_move(fx(0.4));
        assert!(belt.try_receive(parcel()));

        // Both items want to advance 1.0; the head clamps at 0.7 and the
        // follower must stay min_spacing behind it.
        belt.step_move(fx(1.0));
        let positions: Vec<Fixed64> = belt.items().map(|i| i.position).collect();
        assert_eq!(positions, vec![fx(0.7), fx(0.4)]);
    }

    // -----------------------------------------------------------------------
    // Test 4: entry rejected until the tail clears min spacing
    // -----------------------------------------------------------------------
    #[test]
    fn entry_blocked_until_tail_clears_spacing() {
        let mut belt = test_belt(1.0);
        belt.try_receive(parcel());
        // Tail at 0: no room for a second item.
        assert!(!belt.can_accept_item());
        assert!(!belt.try_receive(parcel()));
        assert_eq!(belt.len(), 1);

        belt.set_move_context(fx(1.0), false);
        belt.step_move(fx(0.3));
        assert!(belt.can_accept_item());
        assert!(belt.try_receive(parcel()));
    }

    // -----------------------------------------------------------------------
    // Test 5: capacity is enforced independently of spacing
    // -----------------------------------------------------------------------
    #[test]
    fn capacity_enforced() {
        let mut belt = test_belt(1.0);
        belt.set_move_context(fx(1.0), true);
        for _ in 0..3 {
            assert!(belt.try_receive(parcel()));
            belt.step_move(fx(1.0));
        }
        assert_eq!(belt.len(), 3);
        // Tail has cleared spacing, but the belt is at capacity.
        assert!(belt.tail_position().unwrap() >= fx(0.3));
        assert!(!belt.try_receive(parcel()));
    }

    // -----------------------------------------------------------------------
    // Test 6: zero speed halts Move but the head can still leave
    // -----------------------------------------------------------------------
    #[test]
    fn zero_speed_still_provides() {
        let mut belt = test_belt(1.0);
        belt.try_receive(parcel());
        belt.set_move_context(fx(1.0), true);
        belt.step_move(fx(1.0));
        assert!(belt.head_ready());

        // Power cut: speed drops to zero, the advanced head still exits.
        belt.set_move_context(Fixed64::ZERO, true);
        belt.step_move(fx(1.0));
        assert!(belt.can_provide());
        assert!(belt.try_provide().is_some());
        assert!(belt.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 7: take_head refuses an unfinished traversal
    // -----------------------------------------------------------------------
    #[test]
    fn take_head_requires_completed_traversal() {
        let mut belt = test_belt(1.0);
        belt.try_receive(parcel());
        belt.set_move_context(fx(1.0), false);
        belt.step_move(fx(0.5));
        assert!(belt.take_head().is_none());
        assert_eq!(belt.len(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 8: accept_item resets position, preserving the stable id
    // -----------------------------------------------------------------------
    #[test]
    fn accept_item_resets_position() {
        let mut upstream = test_belt(1.0);
        let mut downstream = test_belt(1.0);
        upstream.try_receive(parcel());
        upstream.set_move_context(fx(1.0), true);
        upstream.step_move(fx(1.0));

        let item = upstream.take_head().unwrap();
        let id = item.id;
        assert!(downstream.can_accept_item());
        downstream.accept_item(item);
        assert_eq!(downstream.head_position(), Some(Fixed64::ZERO));
        assert_eq!(downstream.head().unwrap().id, id);
    }

    // -----------------------------------------------------------------------
    // Test 9: out_dir rotation drops the cached connection
    // -----------------------------------------------------------------------
    #[test]
    fn rotation_invalidates_connection() {
        use crate::connect::ConnectionCache;
        use crate::id::NodeId;

        let mut belt = test_belt(1.0);
        belt.set_connection(Some(ConnectionCache {
            node: NodeId::default(),
            dir: Direction::East,
        }));
        belt.set_out_dir(Direction::East); // unchanged, cache kept
        assert!(belt.connection().is_some());
        belt.set_out_dir(Direction::North);
        assert!(belt.connection().is_none());
    }
}

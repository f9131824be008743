//! Grid node sum type and the endpoint nodes (source, sink).
//!
//! The network stores one `Node` per occupied cell and dispatches the port
//! contract over the enum, keeping the hot path free of boxed trait objects.

use crate::belt::BeltSegment;
use crate::crosser::Crosser;
use crate::distributor::Distributor;
use crate::filter::Filter;
use crate::grid::{Cell, Direction};
use crate::id::ItemTypeId;
use crate::item::ItemParcel;
use crate::port::{ItemPort, PortClass, TransitNode};
use std::collections::{BTreeMap, VecDeque};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Injects externally-enqueued parcels into the network. Parcels wait in a
/// bounded pending queue until the downstream port takes them.
#[derive(Debug)]
pub struct SourceNode {
    cell: Cell,
    facing: Direction,
    pending: VecDeque<ItemParcel>,
    capacity: usize,
}

impl SourceNode {
    pub fn new(cell: Cell, facing: Direction, capacity: usize) -> Self {
        Self {
            cell,
            facing,
            pending: VecDeque::new(),
            capacity,
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn peek_pending(&self) -> Option<&ItemParcel> {
        self.pending.front()
    }

    /// Queue a parcel for injection. Fails when the pending queue is full.
    pub fn enqueue(&mut self, parcel: ItemParcel) -> bool {
        if self.pending.len() >= self.capacity {
            return false;
        }
        self.pending.push_back(parcel);
        true
    }
}

impl ItemPort for SourceNode {
    fn can_receive(&self, _parcel: &ItemParcel) -> bool {
        false
    }

    fn can_provide(&self) -> bool {
        !self.pending.is_empty()
    }

    fn try_receive(&mut self, _parcel: ItemParcel) -> bool {
        false
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        self.pending.pop_front()
    }

    fn port_class(&self) -> PortClass {
        PortClass::Source
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Consumes every parcel offered to it and keeps per-type receipt tallies.
#[derive(Debug)]
pub struct SinkNode {
    cell: Cell,
    received: BTreeMap<ItemTypeId, u64>,
    total: u64,
}

impl SinkNode {
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            received: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn total_received(&self) -> u64 {
        self.total
    }

    pub fn received_of(&self, item_type: ItemTypeId) -> u64 {
        self.received.get(&item_type).copied().unwrap_or(0)
    }
}

impl ItemPort for SinkNode {
    fn can_receive(&self, _parcel: &ItemParcel) -> bool {
        true
    }

    fn can_provide(&self) -> bool {
        false
    }

    fn try_receive(&mut self, parcel: ItemParcel) -> bool {
        *self.received.entry(parcel.item_type).or_insert(0) += u64::from(parcel.quantity);
        self.total += u64::from(parcel.quantity);
        true
    }

    fn try_provide(&mut self) -> Option<ItemParcel> {
        None
    }

    fn port_class(&self) -> PortClass {
        PortClass::Sink
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Node {
    Belt(BeltSegment),
    Distributor(Distributor),
    Filter(Filter),
    Crosser(Crosser),
    Source(SourceNode),
    Sink(SinkNode),
}

impl Node {
    pub fn cell(&self) -> Cell {
        match self {
            Node::Belt(n) => n.cell(),
            Node::Distributor(n) => n.cell(),
            Node::Filter(n) => n.cell(),
            Node::Crosser(n) => n.cell(),
            Node::Source(n) => n.cell(),
            Node::Sink(n) => n.cell(),
        }
    }

    /// Parcels currently held by this node.
    pub fn in_transit_count(&self) -> u64 {
        match self {
            Node::Belt(n) => n.len() as u64,
            Node::Distributor(n) => n.queue_len() as u64,
            Node::Filter(n) => (n.primary_len() + n.reject_len()) as u64,
            Node::Crosser(n) => n.total_queued() as u64,
            Node::Source(n) => n.pending_len() as u64,
            Node::Sink(_) => 0,
        }
    }

    pub fn port(&self) -> &dyn ItemPort {
        match self {
            Node::Belt(n) => n,
            Node::Distributor(n) => n,
            Node::Filter(n) => n,
            Node::Crosser(n) => n,
            Node::Source(n) => n,
            Node::Sink(n) => n,
        }
    }

    pub fn port_mut(&mut self) -> &mut dyn ItemPort {
        match self {
            Node::Belt(n) => n,
            Node::Distributor(n) => n,
            Node::Filter(n) => n,
            Node::Crosser(n) => n,
            Node::Source(n) => n,
            Node::Sink(n) => n,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Direction resolution (auto-tiling) for belt segments.
//!
//! Placement, removal, and neighbor changes mark cells in a dirty set; the
//! network drains the set once per tick boundary and resolves each marked
//! segment at most once, which guarantees termination and prevents
//! order-dependent oscillation.
//!
//! Resolution mutates only the segment being resolved (the self-only
//! variant): the output is the first of forward/right/left with a
//! compatible downstream, and the input is whichever rear neighbor has its
//! own output pointed at this cell. Neighbors are read, never written.

use crate::belt::BeltSegment;
use crate::connect::downstream_compatible;
use crate::grid::{Cell, Direction};
use crate::id::NodeId;
use crate::item::ItemParcel;
use crate::node::Node;
use crate::port::TransitNode;
use slotmap::SlotMap;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Dirty set
// ---------------------------------------------------------------------------

/// Debounced queue of cells whose segments need direction resolution.
/// A set, so a segment is resolved at most once per tick no matter how many
/// neighbor changes touched it.
#[derive(Debug, Default)]
pub struct DirectionResolver {
    dirty: std::collections::BTreeSet<Cell>,
}

impl DirectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a single cell for resolution.
    pub fn mark(&mut self, cell: Cell) {
        self.dirty.insert(cell);
    }

    /// Mark the four neighbors of a changed cell.
    pub fn mark_neighbors(&mut self, cell: Cell) {
        for n in cell.neighbors() {
            self.dirty.insert(n);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Take the pending cells, leaving the set empty.
    pub fn drain(&mut self) -> Vec<Cell> {
        let cells: Vec<Cell> = self.dirty.iter().copied().collect();
        self.dirty.clear();
        cells
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Compute the resolved `(out_dir, in_dir)` for a segment from its current
/// neighbors. Pure: the caller applies the result to the segment.
pub fn resolve_directions(
    nodes: &SlotMap<NodeId, Node>,
    ports: &BTreeMap<Cell, NodeId>,
    belt: &BeltSegment,
) -> (Direction, Direction) {
    let mut probe = ItemParcel::probe();
    probe.display_position = crate::grid::cell_to_world(belt.cell());

    // Output: forward, right, left against the downstream predicate.
    // No success keeps the current facing.
    let mut out_dir = belt.out_dir();
    let forward = out_dir;
    for dir in [forward, forward.right(), forward.left()] {
        if let Some(&id) = ports.get(&belt.cell().step(dir))
            && let Some(target) = nodes.get(id)
            && downstream_compatible(dir, target, &probe)
        {
            out_dir = dir;
            break;
        }
    }

    // Input: independently, the first of back/right-of-back/left-of-back
    // whose occupant is a belt with its output pointed at this cell.
    let back = out_dir.opposite();
    let mut in_dir = back;
    for dir in [back, back.right(), back.left()] {
        if dir == out_dir {
            continue;
        }
        if let Some(&id) = ports.get(&belt.cell().step(dir))
            && let Some(Node::Belt(neighbor)) = nodes.get(id)
            && neighbor.out_dir() == dir.opposite()
        {
            in_dir = dir;
            break;
        }
    }

    (out_dir, in_dir)
}

// ===========================================================================
// Tests
// ===========================================================================

//! The item port contract: the sole capability boundary through which nodes
//! exchange parcels.
//!
//! All operations are synchronous and non-blocking. "Full" and "not ready"
//! are ordinary `false`/`None` returns, never errors. The scheduler and the
//! routing components depend only on these traits, so alternative node
//! implementations plug into the same machinery.

use crate::fixed::Seconds;
use crate::grid::{Cell, Direction};
use crate::item::ItemParcel;

// ---------------------------------------------------------------------------
// Port classification
// ---------------------------------------------------------------------------

/// Coarse classification used by the downstream-compatibility predicate.
/// A second, small capability next to [`ItemPort`] so direction rules stay
/// out of the main contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    /// A belt-like node with a declared input direction.
    Conveyor,
    /// A pure sink: receives, never provides.
    Sink,
    /// A pure source: provides, never receives. Never a valid downstream.
    Source,
    /// Anything else. Compatible whenever it can receive.
    Generic,
}

// ---------------------------------------------------------------------------
// ItemPort
// ---------------------------------------------------------------------------

/// Capability interface every grid node implements to exchange parcels.
pub trait ItemPort {
    /// Pure query: would `try_receive` accept this parcel right now?
    fn can_receive(&self, parcel: &ItemParcel) -> bool;

    /// Pure query: is a parcel ready to leave this node?
    fn can_provide(&self) -> bool;

    /// Accept the parcel iff `can_receive`, else no-op and return `false`.
    fn try_receive(&mut self, parcel: ItemParcel) -> bool;

    /// Remove and return the ready parcel, else no-op and return `None`.
    fn try_provide(&mut self) -> Option<ItemParcel>;

    /// Classification for direction-compatibility checks.
    fn port_class(&self) -> PortClass {
        PortClass::Generic
    }

    /// The direction from which this node accepts parcels, for nodes that
    /// declare one (conveyors). Points toward the upstream cell.
    fn declared_input_dir(&self) -> Option<Direction> {
        None
    }
}

// ---------------------------------------------------------------------------
// TransitNode
// ---------------------------------------------------------------------------

/// What the path scheduler requires of a belt-like node. Transfer touches
/// two nodes at once and is orchestrated by the network; the Move phase goes
/// through this trait.
pub trait TransitNode {
    fn cell(&self) -> Cell;

    /// Direction toward the upstream cell.
    fn in_dir(&self) -> Direction;

    /// Direction of travel, toward the downstream cell.
    fn out_dir(&self) -> Direction;

    /// Advance item positions by one tick. The move context (effective
    /// speed, exit gate) has been set by the caller beforehand.
    fn step_move(&mut self, dt: Seconds);
}

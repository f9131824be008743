//! Connection resolution: validating and re-deriving a belt segment's cached
//! downstream target.
//!
//! A segment caches `{node, direction}`. The cache is never trusted blindly:
//! before each use it is revalidated against the port registry (same node
//! still at `cell + direction`) and the compatibility predicate. On failure
//! the segment re-resolves by testing straight-ahead, right, then left —
//! never the reverse of its input — and rotates its own output to the first
//! compatible direction.

use crate::belt::BeltSegment;
use crate::grid::{Cell, Direction, cell_to_world};
use crate::id::NodeId;
use crate::item::ItemParcel;
use crate::node::Node;
use crate::port::{ItemPort, PortClass, TransitNode};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// A resolved downstream link: which node, reached by which output
/// direction. Derived state; always revalidated before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCache {
    pub node: NodeId,
    pub dir: Direction,
}

/// Whether `target` is a valid downstream for traffic traveling in
/// `travel_dir`.
///
/// - Belts must face away from us: their declared input is the reverse of
///   the travel direction.
/// - Pure sinks qualify whenever they can receive.
/// - Pure sources never qualify.
/// - Anything else qualifies whenever it can receive (permissive default).
pub fn downstream_compatible(travel_dir: Direction, target: &Node, probe: &ItemParcel) -> bool {
    let port = target.port();
    match port.port_class() {
        PortClass::Conveyor => port.declared_input_dir() == Some(travel_dir.opposite()),
        PortClass::Sink => port.can_receive(probe),
        PortClass::Source => false,
        PortClass::Generic => port.can_receive(probe),
    }
}

/// The candidate output directions for a segment, in resolution order:
/// straight ahead (away from the input), then right, then left. The reverse
/// of the input is never a candidate.
pub fn output_candidates(in_dir: Direction) -> [Direction; 3] {
    let forward = in_dir.opposite();
    [forward, forward.right(), forward.left()]
}

/// Validate the segment's cached connection, or re-resolve it.
///
/// Pure with respect to the network: the caller applies the returned cache
/// (rotating the segment's output to match) or clears it on `None`.
pub fn resolve(
    nodes: &SlotMap<NodeId, Node>,
    ports: &BTreeMap<Cell, NodeId>,
    belt: &BeltSegment,
) -> Option<ConnectionCache> {
    // Probe with the actual head parcel when there is one, so type-aware
    // ports answer for the parcel that would really arrive. Stamped with
    // this segment's cell the way a real handoff would be, so receivers
    // that infer the sender's position answer correctly.
    let mut probe = belt
        .head()
        .map(|item| item.parcel)
        .unwrap_or_else(ItemParcel::probe);
    probe.display_position = cell_to_world(belt.cell());

    // Fast path: the cached target is still the registered port at the
    // cached direction and still compatible.
    if let Some(cache) = belt.connection()
        && ports.get(&belt.cell().step(cache.dir)) == Some(&cache.node)
        && let Some(target) = nodes.get(cache.node)
        && downstream_compatible(cache.dir, target, &probe)
    {
        return Some(cache);
    }

    // Re-resolve: straight, right, left relative to the input.
    for dir in output_candidates(belt.in_dir()) {
        let Some(&id) = ports.get(&belt.cell().step(dir)) else {
            continue;
        };
        let Some(target) = nodes.get(id) else {
            continue;
        };
        if downstream_compatible(dir, target, &probe) {
            return Some(ConnectionCache { node: id, dir });
        }
    }
    None
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belt::BeltConfig;
    use crate::fixed::f64_to_fixed64 as fx;
    use crate::id::{ItemTypeId, ParcelIdAlloc};
    use crate::node::{SinkNode, SourceNode};

    fn belt_node(cell: Cell, facing: Direction) -> Node {
        Node::Belt(BeltSegment::new(
            cell,
            facing,
            BeltConfig::plain(3, fx(0.3), fx(1.0)),
            ParcelIdAlloc::new(),
        ))
    }

    struct World {
        nodes: SlotMap<NodeId, Node>,
        ports: BTreeMap<Cell, NodeId>,
    }

    impl World {
        fn new() -> Self {
            Self {
                nodes: SlotMap::with_key(),
                ports: BTreeMap::new(),
            }
        }

        fn add(&mut self, node: Node) -> NodeId {
            let cell = node.cell();
            let id = self.nodes.insert(node);
            self.ports.insert(cell, id);
            id
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: a facing-away belt straight ahead is adopted
    // -----------------------------------------------------------------------
    #[test]
    fn straight_belt_is_adopted() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        let dst = w.add(belt_node(Cell::new(1, 0), Direction::East));

        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        let cache = resolve(&w.nodes, &w.ports, belt).unwrap();
        assert_eq!(cache.node, dst);
        assert_eq!(cache.dir, Direction::East);
    }

    // -----------------------------------------------------------------------
    // Test 2: a belt facing into us is incompatible; resolution turns right
    // -----------------------------------------------------------------------
    #[test]
    fn head_on_belt_rejected_side_belt_adopted() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        // Head-on: faces West, its input points East toward us -> its
        // declared input is East, but we need West.opposite()... it faces us.
        w.add(belt_node(Cell::new(1, 0), Direction::West));
        // Right of an eastbound belt is South.
        let south = w.add(belt_node(Cell::new(0, -1), Direction::South));

        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        let cache = resolve(&w.nodes, &w.ports, belt).unwrap();
        assert_eq!(cache.node, south);
        assert_eq!(cache.dir, Direction::South);
    }

    // -----------------------------------------------------------------------
    // Test 3: the reverse of the input is never tested
    // -----------------------------------------------------------------------
    #[test]
    fn never_connects_backward() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        // Only neighbor is behind us (West side), facing further West:
        // geometrically receptive, but it is the reverse of our input.
        w.add(belt_node(Cell::new(-1, 0), Direction::West));

        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        assert!(resolve(&w.nodes, &w.ports, belt).is_none());
    }

    // -----------------------------------------------------------------------
    // Test 4: sinks qualify via can_receive, sources never do
    // -----------------------------------------------------------------------
    #[test]
    fn sink_compatible_source_never() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        let sink = w.add(Node::Sink(SinkNode::new(Cell::new(1, 0))));
        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        let cache = resolve(&w.nodes, &w.ports, belt).unwrap();
        assert_eq!(cache.node, sink);

        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        w.add(Node::Source(SourceNode::new(
            Cell::new(1, 0),
            Direction::West,
            4,
        )));
        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        assert!(resolve(&w.nodes, &w.ports, belt).is_none());
    }

    // -----------------------------------------------------------------------
    // Test 5: a stale cache pointing at a removed node re-resolves
    // -----------------------------------------------------------------------
    #[test]
    fn stale_cache_re_resolves() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        let old = w.add(belt_node(Cell::new(1, 0), Direction::East));

        // Cache the east link, then replace the east neighbor entirely.
        let cache = {
            let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
            resolve(&w.nodes, &w.ports, belt).unwrap()
        };
        if let Node::Belt(belt) = &mut w.nodes[src] {
            belt.set_connection(Some(cache));
        }
        w.nodes.remove(old);
        w.ports.remove(&Cell::new(1, 0));
        let replacement = w.add(belt_node(Cell::new(1, 0), Direction::East));

        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        let cache = resolve(&w.nodes, &w.ports, belt).unwrap();
        assert_eq!(cache.node, replacement);
        assert_ne!(cache.node, old);
    }

    // -----------------------------------------------------------------------
    // Test 6: probe uses the head parcel for type-aware targets
    // -----------------------------------------------------------------------
    #[test]
    fn probe_reflects_head_parcel() {
        let mut w = World::new();
        let src = w.add(belt_node(Cell::new(0, 0), Direction::East));
        let sink = w.add(Node::Sink(SinkNode::new(Cell::new(1, 0))));

        if let Node::Belt(belt) = &mut w.nodes[src] {
            belt.try_receive(ItemParcel::new(ItemTypeId(7)));
        }
        let Node::Belt(belt) = &w.nodes[src] else { unreachable!() };
        let cache = resolve(&w.nodes, &w.ports, belt).unwrap();
        assert_eq!(cache.node, sink);
    }
}

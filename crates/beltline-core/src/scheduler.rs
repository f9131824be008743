//! The path scheduler: chain decomposition of the belt graph and the
//! two-phase tick ordering that prevents same-step duplication.
//!
//! A chain is a maximal walk of belt segments along resolved output links.
//! Decomposition starts from every segment with no incoming link and stops
//! at a revisited segment (cycle) or a non-belt/empty target; segments left
//! over after that (pure rings) are walked into their own chains.
//!
//! Per tick the network runs Move for every segment in every chain, then —
//! only after the global barrier — each chain's Transfer walk in reverse
//! (tail-to-head) order, so a downstream segment's capacity is settled
//! before any upstream segment consults it.

use crate::grid::Cell;
use crate::id::NodeId;
use crate::node::Node;
use crate::port::TransitNode;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::BTreeMap;

/// Chain decomposition of the belt graph. Rebuilt (debounced to once per
/// affected tick) on any placement, removal, or direction change.
#[derive(Debug, Default)]
pub struct PathScheduler {
    chains: Vec<Vec<NodeId>>,
    needs_rebuild: bool,
}

impl PathScheduler {
    pub fn new() -> Self {
        Self {
            chains: Vec::new(),
            needs_rebuild: true,
        }
    }

    /// Request a rebuild at the next tick boundary.
    pub fn mark_rebuild(&mut self) {
        self.needs_rebuild = true;
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// The current decomposition, upstream-to-downstream within each chain.
    pub fn chains(&self) -> &[Vec<NodeId>] {
        &self.chains
    }

    /// Recompute the decomposition from the current belt graph.
    pub fn rebuild(&mut self, nodes: &SlotMap<NodeId, Node>, ports: &BTreeMap<Cell, NodeId>) {
        self.needs_rebuild = false;
        self.chains.clear();

        // Geometry link: the downstream of a belt is the belt in its output
        // cell whose input points back at it. Capacity plays no part here;
        // it is checked at transfer time.
        let downstream = |id: NodeId| -> Option<NodeId> {
            let Some(Node::Belt(belt)) = nodes.get(id) else {
                return None;
            };
            let next = *ports.get(&belt.cell().step(belt.out_dir()))?;
            match nodes.get(next) {
                Some(Node::Belt(n)) if n.in_dir() == belt.out_dir().opposite() => Some(next),
                _ => None,
            }
        };

        let belt_ids: Vec<NodeId> = nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::Belt(_)))
            .map(|(id, _)| id)
            .collect();

        // Segments that some other segment's resolved output targets.
        let mut has_incoming: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        for &id in &belt_ids {
            if let Some(next) = downstream(id) {
                has_incoming.insert(next, ());
            }
        }

        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let walk = |start: NodeId, visited: &mut SecondaryMap<NodeId, ()>| -> Vec<NodeId> {
            let mut chain = Vec::new();
            let mut cursor = Some(start);
            while let Some(id) = cursor {
                if visited.contains_key(id) {
                    break; // cycle or junction into an existing chain
                }
                visited.insert(id, ());
                chain.push(id);
                cursor = downstream(id);
            }
            chain
        };

        // Chains from every source segment (no incoming link).
        for &id in &belt_ids {
            if !has_incoming.contains_key(id) {
                let chain = walk(id, &mut visited);
                if !chain.is_empty() {
                    self.chains.push(chain);
                }
            }
        }

        // Leftovers are pure rings: cut each at an arbitrary entry point.
        for &id in &belt_ids {
            if !visited.contains_key(id) {
                let chain = walk(id, &mut visited);
                if !chain.is_empty() {
                    self.chains.push(chain);
                }
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

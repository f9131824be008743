//! The network: node storage, placement lifecycle, and the fixed-step tick.
//!
//! One simulation step runs six phases:
//!
//! 1. **Structural** — drain the direction-resolution dirty set, then
//!    rebuild the path scheduler's chain decomposition if anything changed.
//! 2. **Move** — per chain, upstream first: resolve each segment's power
//!    speed and exit gate, then advance its items. A global barrier: no
//!    Transfer starts until every segment has moved.
//! 3. **Transfer** — per chain, downstream first: completed head items hand
//!    off, belt-to-belt by geometry (keeping the stable item id) and to
//!    everything else through the revalidated connection's port.
//! 4. **Routing** — distributors, filters, and crossers accrue budget and
//!    run egress under their policies; sources push pending parcels out.
//! 5. **Events** — buffered events reach their listeners.
//! 6. **Bookkeeping** — the tick counter advances.
//!
//! Wall-clock time enters only through [`Network::advance`], a fixed-step
//! accumulator: steps always run with the configured interval, so the same
//! placements and injections replay to the same state regardless of how the
//! caller slices real time.

use crate::autotile::{DirectionResolver, resolve_directions};
use crate::belt::{BeltConfig, BeltSegment};
use crate::connect::{self, downstream_compatible};
use crate::crosser::Crosser;
use crate::distributor::Distributor;
use crate::event::{Event, EventBus};
use crate::filter::{Filter, FilterConfig};
use crate::fixed::{Fixed64, Seconds, Ticks};
use crate::grid::{Axis, Cell, Direction, cell_to_world};
use crate::id::{ItemTypeId, NodeId, ParcelIdAlloc};
use crate::item::ItemParcel;
use crate::node::{Node, SinkNode, SourceNode};
use crate::port::{ItemPort, TransitNode};
use crate::power::{NoPower, PowerService};
use crate::registry::ItemRegistry;
use crate::scheduler::PathScheduler;
use slotmap::SlotMap;
use std::collections::BTreeMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("cell ({}, {}) is already occupied", .0.x, .0.y)]
    Occupied(Cell),
    #[error("item type {0:?} is not defined in the registry")]
    UnknownItemType(ItemTypeId),
    #[error("no such node")]
    NoSuchNode,
    #[error("node is not a source")]
    NotASource,
    #[error("source pending queue is full")]
    SourceFull,
}

/// Outcome of [`Network::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Fixed steps executed for this slice of wall-clock time.
    pub steps_run: u32,
}

/// Where an offered parcel ended up.
enum Offer {
    /// The target took the parcel and holds it.
    Accepted,
    /// The target took the parcel and immediately discarded it.
    Discarded,
    /// The target refused; the parcel stays with the caller.
    Refused,
}

impl Offer {
    fn taken(&self) -> bool {
        !matches!(self, Offer::Refused)
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

pub struct Network {
    nodes: SlotMap<NodeId, Node>,
    ports: BTreeMap<Cell, NodeId>,
    scheduler: PathScheduler,
    resolver: DirectionResolver,
    events: EventBus,
    registry: ItemRegistry,
    power: Box<dyn PowerService>,
    ids: ParcelIdAlloc,
    tick_interval: Seconds,
    accumulator: Seconds,
    tick: Ticks,
    // Conservation counters: injected == in-transit + delivered + discarded
    // + removal-dropped at every tick boundary.
    injected: u64,
    delivered: u64,
    discarded: u64,
    removal_dropped: u64,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.nodes.len())
            .field("tick", &self.tick)
            .field("injected", &self.injected)
            .field("delivered", &self.delivered)
            .field("discarded", &self.discarded)
            .field("removal_dropped", &self.removal_dropped)
            .finish()
    }
}

impl Network {
    /// A network with no power coverage: powered belt variants run at their
    /// powerless speed.
    pub fn new(registry: ItemRegistry, tick_interval: Seconds) -> Self {
        Self::with_power(registry, tick_interval, Box::new(NoPower))
    }

    pub fn with_power(
        mut registry: ItemRegistry,
        tick_interval: Seconds,
        power: Box<dyn PowerService>,
    ) -> Self {
        registry.freeze();
        Self {
            nodes: SlotMap::with_key(),
            ports: BTreeMap::new(),
            scheduler: PathScheduler::new(),
            resolver: DirectionResolver::new(),
            events: EventBus::new(),
            registry,
            power,
            ids: ParcelIdAlloc::new(),
            tick_interval,
            accumulator: Fixed64::ZERO,
            tick: 0,
            injected: 0,
            delivered: 0,
            discarded: 0,
            removal_dropped: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Placement lifecycle
    // -----------------------------------------------------------------------

    fn place(&mut self, cell: Cell, node: Node) -> Result<NodeId, NetworkError> {
        if self.ports.contains_key(&cell) {
            return Err(NetworkError::Occupied(cell));
        }
        let id = self.nodes.insert(node);
        self.ports.insert(cell, id);
        self.resolver.mark(cell);
        self.resolver.mark_neighbors(cell);
        self.scheduler.mark_rebuild();
        self.events.emit(Event::NodePlaced {
            node: id,
            cell,
            tick: self.tick,
        });
        Ok(id)
    }

    pub fn place_belt(
        &mut self,
        cell: Cell,
        facing: Direction,
        config: BeltConfig,
    ) -> Result<NodeId, NetworkError> {
        let segment = BeltSegment::new(cell, facing, config, self.ids.clone());
        self.place(cell, Node::Belt(segment))
    }

    pub fn place_distributor(
        &mut self,
        cell: Cell,
        facing: Direction,
        capacity: usize,
        rate: Fixed64,
    ) -> Result<NodeId, NetworkError> {
        self.place(cell, Node::Distributor(Distributor::new(cell, facing, capacity, rate)))
    }

    /// Place a filter. A filter configured with an item type the registry
    /// does not know is placed anyway but permanently deactivated: it
    /// refuses every parcel and never runs egress. Availability over
    /// failure for configuration mistakes.
    pub fn place_filter(
        &mut self,
        cell: Cell,
        facing: Direction,
        config: FilterConfig,
    ) -> Result<NodeId, NetworkError> {
        let known = match config.allow {
            Some(t) => self.registry.contains(t),
            None => true,
        };
        let mut filter = Filter::new(cell, facing, config);
        if !known {
            filter.deactivate();
        }
        self.place(cell, Node::Filter(filter))
    }

    pub fn place_crosser(
        &mut self,
        cell: Cell,
        main_axis: Axis,
        capacity: usize,
        rate: Fixed64,
    ) -> Result<NodeId, NetworkError> {
        self.place(cell, Node::Crosser(Crosser::new(cell, main_axis, capacity, rate)))
    }

    pub fn place_source(
        &mut self,
        cell: Cell,
        facing: Direction,
        capacity: usize,
    ) -> Result<NodeId, NetworkError> {
        self.place(cell, Node::Source(SourceNode::new(cell, facing, capacity)))
    }

    pub fn place_sink(&mut self, cell: Cell) -> Result<NodeId, NetworkError> {
        self.place(cell, Node::Sink(SinkNode::new(cell)))
    }

    /// Remove a node. In-flight parcels it held are dropped and counted.
    pub fn remove(&mut self, id: NodeId) -> Result<u32, NetworkError> {
        let Some(node) = self.nodes.remove(id) else {
            return Err(NetworkError::NoSuchNode);
        };
        let cell = node.cell();
        let dropped = node.in_transit_count() as u32;
        self.ports.remove(&cell);
        self.removal_dropped += u64::from(dropped);
        self.resolver.mark_neighbors(cell);
        self.scheduler.mark_rebuild();
        self.events.emit(Event::NodeRemoved {
            node: id,
            cell,
            dropped,
            tick: self.tick,
        });
        Ok(dropped)
    }

    /// Queue a parcel on a source for injection into the network.
    pub fn inject(&mut self, source: NodeId, item_type: ItemTypeId) -> Result<(), NetworkError> {
        if !self.registry.contains(item_type) {
            return Err(NetworkError::UnknownItemType(item_type));
        }
        let Some(node) = self.nodes.get_mut(source) else {
            return Err(NetworkError::NoSuchNode);
        };
        let Node::Source(src) = node else {
            return Err(NetworkError::NotASource);
        };
        let mut parcel = ItemParcel::new(item_type);
        parcel.display_position = cell_to_world(src.cell());
        if !src.enqueue(parcel) {
            return Err(NetworkError::SourceFull);
        }
        self.injected += 1;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_at(&self, cell: Cell) -> Option<&Node> {
        self.ports.get(&cell).and_then(|id| self.nodes.get(*id))
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Parcels currently held anywhere in the network.
    pub fn total_in_transit(&self) -> u64 {
        self.nodes.values().map(Node::in_transit_count).sum()
    }

    pub fn injected(&self) -> u64 {
        self.injected
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn removal_dropped(&self) -> u64 {
        self.removal_dropped
    }

    // -----------------------------------------------------------------------
    // Tick driver
    // -----------------------------------------------------------------------

    /// Feed wall-clock time into the fixed-step accumulator and run every
    /// step that became due.
    pub fn advance(&mut self, dt: Seconds) -> AdvanceResult {
        self.accumulator += dt;
        let mut steps_run = 0;
        while self.accumulator >= self.tick_interval {
            self.accumulator -= self.tick_interval;
            self.step();
            steps_run += 1;
        }
        AdvanceResult { steps_run }
    }

    /// Run exactly one fixed step.
    pub fn step(&mut self) {
        let dt = self.tick_interval;
        self.phase_structural();
        self.phase_move(dt);
        self.phase_transfer();
        self.phase_routing(dt);
        self.events.deliver();
        self.tick += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: structural
    // -----------------------------------------------------------------------

    fn phase_structural(&mut self) {
        for cell in self.resolver.drain() {
            let Some(&id) = self.ports.get(&cell) else {
                continue;
            };
            let resolved = match self.nodes.get(id) {
                Some(Node::Belt(belt)) => resolve_directions(&self.nodes, &self.ports, belt),
                _ => continue,
            };
            let mut changed = false;
            if let Some(Node::Belt(belt)) = self.nodes.get_mut(id) {
                let (out_dir, in_dir) = resolved;
                changed = belt.out_dir() != out_dir || belt.in_dir() != in_dir;
                belt.set_out_dir(out_dir);
                belt.set_in_dir(in_dir);
            }
            if changed {
                self.scheduler.mark_rebuild();
            }
        }
        if self.scheduler.needs_rebuild() {
            self.scheduler.rebuild(&self.nodes, &self.ports);
            self.events.emit(Event::ChainsRebuilt {
                chain_count: self.scheduler.chains().len(),
                tick: self.tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: move
    // -----------------------------------------------------------------------

    fn phase_move(&mut self, dt: Seconds) {
        self.power.begin_tick();
        // Downstream-first within each chain, like Transfer: the exit gate
        // reads the downstream belt's tail, which must already be this
        // tick's settled position or a full line moves only every other
        // tick.
        let order: Vec<NodeId> = self
            .scheduler
            .chains()
            .iter()
            .flat_map(|chain| chain.iter().rev())
            .copied()
            .collect();
        let mut rebuild = false;
        for id in order {
            let Some(Node::Belt(belt)) = self.nodes.get(id) else {
                continue;
            };
            let cell = belt.cell();

            // Power-linked speed. The draw is proportional to the number of
            // in-transit items; a refused draw falls back to powerless.
            let speed = match &belt.config().power {
                Some(profile) => {
                    let draw = profile.draw_per_item * Fixed64::from_num(belt.len() as i64);
                    if self.power.is_cell_powered(cell)
                        && self.power.try_consume_power(cell, draw)
                    {
                        profile.powered_speed * self.power.speed_multiplier(cell)
                    } else {
                        profile.powerless_speed
                    }
                }
                None => belt.config().speed,
            };

            // Exit gate: open only when the resolved downstream could take a
            // handoff right now.
            let connection = connect::resolve(&self.nodes, &self.ports, belt);
            let exit_open = match connection {
                Some(cache) => match self.nodes.get(cache.node) {
                    Some(Node::Belt(next)) => next.can_accept_item(),
                    Some(target) => {
                        let mut probe = belt
                            .head()
                            .map(|item| item.parcel)
                            .unwrap_or_else(ItemParcel::probe);
                        probe.display_position = cell_to_world(cell);
                        target.port().can_receive(&probe)
                    }
                    None => false,
                },
                None => false,
            };

            if let Some(Node::Belt(belt)) = self.nodes.get_mut(id) {
                if let Some(cache) = connection
                    && cache.dir != belt.out_dir()
                {
                    belt.set_out_dir(cache.dir);
                    rebuild = true;
                }
                belt.set_connection(connection);
                belt.set_move_context(speed, exit_open);
                belt.step_move(dt);
            }
        }
        if rebuild {
            self.scheduler.mark_rebuild();
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: transfer
    // -----------------------------------------------------------------------

    fn phase_transfer(&mut self) {
        let order: Vec<NodeId> = self
            .scheduler
            .chains()
            .iter()
            .flat_map(|chain| chain.iter().rev())
            .copied()
            .collect();
        for id in order {
            self.transfer_head(id);
        }
    }

    /// Hand the segment's completed head item to its downstream, if both
    /// sides agree this tick.
    fn transfer_head(&mut self, id: NodeId) {
        let (src_cell, connection) = match self.nodes.get(id) {
            Some(Node::Belt(belt)) if belt.head_ready() => (
                belt.cell(),
                connect::resolve(&self.nodes, &self.ports, belt),
            ),
            _ => return,
        };
        let Some(cache) = connection else {
            if let Some(Node::Belt(belt)) = self.nodes.get_mut(id) {
                belt.set_connection(None);
            }
            return;
        };

        // Belt-to-belt moves the BeltItem wholesale so the stable id (and
        // display continuity) survives the hop.
        let belt_to_belt = matches!(self.nodes.get(cache.node), Some(Node::Belt(_)));
        if belt_to_belt {
            if let Some([Node::Belt(src), Node::Belt(dst)]) =
                self.nodes.get_disjoint_mut([id, cache.node])
                && dst.can_accept_item()
                && let Some(mut item) = src.take_head()
            {
                item.parcel.display_position = cell_to_world(src_cell);
                dst.accept_item(item);
            }
            return;
        }

        // Everything else goes through the port contract.
        let Some(Node::Belt(belt)) = self.nodes.get(id) else {
            return;
        };
        let Some(head) = belt.head() else {
            return;
        };
        let parcel = head.parcel;
        match self.offer(src_cell, cache.dir, parcel) {
            Offer::Refused => {}
            _ => {
                if let Some(Node::Belt(src)) = self.nodes.get_mut(id) {
                    let taken = src.take_head();
                    debug_assert!(taken.is_some());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: routing
    // -----------------------------------------------------------------------

    fn phase_routing(&mut self, dt: Seconds) {
        let ids: Vec<NodeId> = self.nodes.keys().collect();
        for id in ids {
            match self.nodes.get(id) {
                Some(Node::Distributor(_)) => self.tick_distributor(id, dt),
                Some(Node::Filter(_)) => self.tick_filter(id, dt),
                Some(Node::Crosser(_)) => self.tick_crosser(id, dt),
                Some(Node::Source(_)) => self.tick_source(id),
                _ => {}
            }
        }
    }

    fn tick_distributor(&mut self, id: NodeId, dt: Seconds) {
        let Some(Node::Distributor(d)) = self.nodes.get_mut(id) else {
            return;
        };
        d.budget_mut().accrue(dt);
        if d.queue_len() == 0 {
            d.budget_mut().discard_whole();
            return;
        }
        loop {
            let (quota, cell, rotation, parcel) = match self.nodes.get(id) {
                Some(Node::Distributor(d)) => match d.peek() {
                    Some(parcel) => (d.budget().quota(), d.cell(), d.exit_rotation(), *parcel),
                    None => break,
                },
                _ => break,
            };
            if quota == 0 {
                break;
            }
            let mut sent = None;
            for (offset, dir) in rotation.into_iter().enumerate() {
                if self.offer(cell, dir, parcel).taken() {
                    sent = Some(offset);
                    break;
                }
            }
            let Some(offset) = sent else {
                break; // all three exits blocked, keep the unspent budget
            };
            if let Some(Node::Distributor(d)) = self.nodes.get_mut(id) {
                let _ = d.try_provide();
                d.budget_mut().spend();
                d.advance_rotation(offset);
            }
        }
    }

    fn tick_filter(&mut self, id: NodeId, dt: Seconds) {
        let Some(Node::Filter(f)) = self.nodes.get_mut(id) else {
            return;
        };
        if !f.is_active() {
            return;
        }
        f.budget_mut().accrue(dt);
        if f.is_idle() {
            f.budget_mut().discard_whole();
            return;
        }

        // Reject lane first.
        let mut reject_progress = false;
        loop {
            let (quota, cell, egress, parcel) = match self.nodes.get(id) {
                Some(Node::Filter(f)) => match f.peek_reject() {
                    Some(parcel) => (f.budget().quota(), f.cell(), f.reject_egress_dir(), *parcel),
                    None => break,
                },
                _ => break,
            };
            if quota == 0 {
                break;
            }
            match egress {
                None => {
                    // Drop policy: no egress call, just discard and account.
                    if let Some(Node::Filter(f)) = self.nodes.get_mut(id) {
                        f.pop_reject();
                        f.record_discard(parcel.quantity);
                        f.budget_mut().spend();
                    }
                    self.discarded += 1;
                    self.events.emit(Event::ParcelDiscarded {
                        node: id,
                        item_type: parcel.item_type,
                        quantity: parcel.quantity,
                        tick: self.tick,
                    });
                    reject_progress = true;
                }
                Some(dir) => {
                    if !self.offer(cell, dir, parcel).taken() {
                        break; // reject egress blocked
                    }
                    if let Some(Node::Filter(f)) = self.nodes.get_mut(id) {
                        f.pop_reject();
                        f.budget_mut().spend();
                    }
                    reject_progress = true;
                }
            }
        }

        // Primary runs only when the reject lane is clear or made no
        // progress (a blocked reject that did move something keeps priority
        // next tick).
        let reject_empty = matches!(
            self.nodes.get(id),
            Some(Node::Filter(f)) if f.reject_len() == 0
        );
        if !reject_empty && reject_progress {
            return;
        }
        loop {
            let (quota, cell, facing, parcel) = match self.nodes.get(id) {
                Some(Node::Filter(f)) => match f.peek_primary() {
                    Some(parcel) => (f.budget().quota(), f.cell(), f.facing(), *parcel),
                    None => break,
                },
                _ => break,
            };
            if quota == 0 {
                break;
            }
            if !self.offer(cell, facing, parcel).taken() {
                break;
            }
            if let Some(Node::Filter(f)) = self.nodes.get_mut(id) {
                f.pop_primary();
                f.budget_mut().spend();
            }
        }
    }

    fn tick_crosser(&mut self, id: NodeId, dt: Seconds) {
        let Some(Node::Crosser(c)) = self.nodes.get_mut(id) else {
            return;
        };
        c.budget_mut().accrue(dt);
        if c.total_queued() == 0 {
            c.budget_mut().discard_whole();
            return;
        }
        loop {
            let (quota, cell, rotation) = match self.nodes.get(id) {
                Some(Node::Crosser(c)) if c.total_queued() > 0 => {
                    (c.budget().quota(), c.cell(), c.lane_rotation())
                }
                _ => break,
            };
            if quota == 0 {
                break;
            }
            let mut sent = None;
            for (offset, dir) in rotation.into_iter().enumerate() {
                let parcel = match self.nodes.get(id) {
                    Some(Node::Crosser(c)) => match c.peek_lane(dir) {
                        Some(parcel) => *parcel,
                        None => continue,
                    },
                    _ => return,
                };
                if self.offer(cell, dir, parcel).taken() {
                    sent = Some((offset, dir));
                    break;
                }
            }
            let Some((offset, dir)) = sent else {
                break;
            };
            if let Some(Node::Crosser(c)) = self.nodes.get_mut(id) {
                c.pop_lane(dir);
                c.budget_mut().spend();
                c.advance_lane(offset);
            }
        }
    }

    fn tick_source(&mut self, id: NodeId) {
        loop {
            let (cell, facing, parcel) = match self.nodes.get(id) {
                Some(Node::Source(s)) => match s.peek_pending() {
                    Some(parcel) => (s.cell(), s.facing(), *parcel),
                    None => return,
                },
                _ => return,
            };
            if !self.offer(cell, facing, parcel).taken() {
                return;
            }
            if let Some(Node::Source(s)) = self.nodes.get_mut(id) {
                let _ = s.try_provide();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Handoff plumbing
    // -----------------------------------------------------------------------

    /// Offer a parcel from `from` toward `dir`. The parcel is stamped with
    /// the sender's cell before delivery so direction-inferring receivers
    /// (crossers) see where it came from. Accounting for sink deliveries and
    /// receive-time filter discards happens here.
    fn offer(&mut self, from: Cell, dir: Direction, parcel: ItemParcel) -> Offer {
        let Some(&target_id) = self.ports.get(&from.step(dir)) else {
            return Offer::Refused;
        };
        let mut parcel = parcel;
        parcel.display_position = cell_to_world(from);

        let pre_discard = match self.nodes.get(target_id) {
            Some(target) => {
                if !downstream_compatible(dir, target, &parcel) {
                    return Offer::Refused;
                }
                match target {
                    Node::Filter(f) => Some(f.discarded()),
                    _ => None,
                }
            }
            None => return Offer::Refused,
        };

        let Some(target) = self.nodes.get_mut(target_id) else {
            return Offer::Refused;
        };
        if !target.port_mut().try_receive(parcel) {
            return Offer::Refused;
        }

        match self.nodes.get(target_id) {
            Some(Node::Sink(_)) => {
                self.delivered += 1;
                self.events.emit(Event::ParcelDelivered {
                    node: target_id,
                    item_type: parcel.item_type,
                    quantity: parcel.quantity,
                    tick: self.tick,
                });
                Offer::Accepted
            }
            Some(Node::Filter(f))
                if pre_discard.is_some_and(|before| f.discarded() > before) =>
            {
                self.discarded += 1;
                self.events.emit(Event::ParcelDiscarded {
                    node: target_id,
                    item_type: parcel.item_type,
                    quantity: parcel.quantity,
                    tick: self.tick,
                });
                Offer::Discarded
            }
            _ => Offer::Accepted,
        }
    }
}

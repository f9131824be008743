//! Beltline Core -- a deterministic grid-based conveyor simulation engine.
//!
//! This crate provides belt segments with continuous item positions, the
//! routing components that connect them, auto-tiled direction resolution,
//! and the fixed-step tick driver that advances everything deterministically
//! on Q32.32 fixed-point math.
//!
//! # Six-Phase Tick Pipeline
//!
//! Each call to [`network::Network::step`] advances the simulation by one
//! tick through the following phases:
//!
//! 1. **Structural** -- Resolve dirty segment directions, rebuild chains.
//! 2. **Move** -- Advance item positions on every segment (global barrier).
//! 3. **Transfer** -- Hand completed head items downstream, tail-to-head
//!    per chain.
//! 4. **Routing** -- Distributors, filters, and crossers run their
//!    throughput-budgeted egress; sources inject.
//! 5. **Post-tick** -- Deliver buffered events.
//! 6. **Bookkeeping** -- Increment the tick counter.
//!
//! # Key Types
//!
//! - [`network::Network`] -- Node storage, placement lifecycle, and the
//!   tick driver with its fixed-step accumulator.
//! - [`belt::BeltSegment`] -- One conveyor cell: an ordered item queue with
//!   positions on `[0, 1)`, min-spacing clamping, and an exit gate.
//! - [`port::ItemPort`] -- The capability contract every node implements to
//!   exchange parcels; [`port::PortClass`] carries the direction rules.
//! - [`distributor::Distributor`], [`filter::Filter`],
//!   [`crosser::Crosser`] -- Routing components with fractional throughput
//!   budgets ([`budget::ThroughputBudget`]).
//! - [`scheduler::PathScheduler`] -- Chain decomposition of the belt graph.
//! - [`power::PowerService`] -- Injected coverage seam for power-linked
//!   belt speeds.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod autotile;
pub mod belt;
pub mod budget;
pub mod connect;
pub mod crosser;
pub mod distributor;
pub mod event;
pub mod filter;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod item;
pub mod network;
pub mod node;
pub mod port;
pub mod power;
pub mod registry;
pub mod scheduler;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

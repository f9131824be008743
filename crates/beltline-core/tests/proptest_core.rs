//! Property-based tests for the Beltline engine.
//!
//! Uses proptest to generate random layouts and injection/step schedules,
//! then verifies the structural invariants hold: parcel conservation, belt
//! ordering and spacing, throughput bounds, and deterministic replay.

use beltline_core::belt::BeltConfig;
use beltline_core::fixed::Fixed64;
use beltline_core::grid::{Cell, Direction};
use beltline_core::network::Network;
use beltline_core::node::Node;
use beltline_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// A straight eastbound line: source, `belts` segments, and optionally a
/// sink at the end. Returns the network and the source id.
fn build_line(belts: usize, speed: f64, with_sink: bool) -> (Network, beltline_core::id::NodeId) {
    let mut net = test_network();
    let src = net
        .place_source(Cell::new(-1, 0), Direction::East, 64)
        .expect("source placement");
    for x in 0..belts as i32 {
        net.place_belt(
            Cell::new(x, 0),
            Direction::East,
            BeltConfig::plain(3, fixed(0.3), fixed(speed)),
        )
        .expect("belt placement");
    }
    if with_sink {
        net.place_sink(Cell::new(belts as i32, 0)).expect("sink placement");
    }
    (net, src)
}

/// Check the ledger: everything injected is somewhere.
fn assert_conserved(net: &Network) {
    assert_eq!(
        net.injected(),
        net.total_in_transit() + net.delivered() + net.discarded() + net.removal_dropped()
    );
}

/// Check every belt's item list is ordered head-first with min spacing
/// between neighbors, inside [0, 1], and within capacity.
fn assert_belt_invariants(net: &Network, belts: usize) {
    for x in 0..belts as i32 {
        let Some(Node::Belt(belt)) = net.node_at(Cell::new(x, 0)) else {
            continue;
        };
        assert!(belt.len() as u32 <= belt.config().capacity);
        let positions: Vec<Fixed64> = belt.items().map(|i| i.position).collect();
        for pair in positions.windows(2) {
            assert!(
                pair[0] >= pair[1] + belt.config().min_spacing,
                "spacing violated on belt {x}: {pair:?}"
            );
        }
        for p in &positions {
            assert!(*p >= Fixed64::ZERO && *p <= Fixed64::from_num(1));
        }
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    // -----------------------------------------------------------------------
    // Property 1: parcels are conserved under arbitrary schedules
    // -----------------------------------------------------------------------
    #[test]
    fn conservation_holds(
        belts in 1usize..6,
        with_sink in any::<bool>(),
        schedule in proptest::collection::vec(0u8..3, 1..40),
    ) {
        let (mut net, src) = build_line(belts, 1.0, with_sink);
        for op in schedule {
            match op {
                0 => { let _ = net.inject(src, iron_ore()); }
                _ => net.step(),
            }
            assert_conserved(&net);
        }
    }

    // -----------------------------------------------------------------------
    // Property 2: ordering and spacing survive every tick
    // -----------------------------------------------------------------------
    #[test]
    fn belt_ordering_and_spacing(
        belts in 1usize..6,
        speed in 0.1f64..3.0,
        injections in 1usize..12,
        steps in 1usize..30,
    ) {
        let (mut net, src) = build_line(belts, speed, true);
        for _ in 0..injections {
            let _ = net.inject(src, iron_ore());
        }
        for _ in 0..steps {
            net.step();
            assert_belt_invariants(&net, belts);
        }
    }

    // -----------------------------------------------------------------------
    // Property 3: a distributor never beats its throughput budget
    // -----------------------------------------------------------------------
    #[test]
    fn distributor_respects_budget(
        rate in 0.25f64..4.0,
        steps in 1u32..40,
    ) {
        let mut net = test_network();
        net.place_sink(Cell::new(1, 0)).expect("sink placement");
        net.place_distributor(Cell::new(0, 0), Direction::East, 64, fixed(rate))
            .expect("distributor placement");
        let src = net
            .place_source(Cell::new(-1, 0), Direction::East, 64)
            .expect("source placement");
        for _ in 0..64 {
            let _ = net.inject(src, iron_ore());
        }
        for _ in 0..steps {
            net.step();
        }
        // dt is 1 per step, so total egress can never exceed rate * steps.
        let ceiling = (fixed(rate) * Fixed64::from_num(steps)).to_num::<u64>();
        prop_assert!(net.delivered() <= ceiling + 1);
        assert_conserved(&net);
    }

    // -----------------------------------------------------------------------
    // Property 4: identical schedules replay to identical states
    // -----------------------------------------------------------------------
    #[test]
    fn deterministic_replay(
        belts in 1usize..6,
        schedule in proptest::collection::vec(0u8..3, 1..30),
    ) {
        let run = |schedule: &[u8]| {
            let (mut net, src) = build_line(belts, 1.0, true);
            for &op in schedule {
                match op {
                    0 => { let _ = net.inject(src, iron_ore()); }
                    _ => net.step(),
                }
            }
            (net.injected(), net.delivered(), net.total_in_transit(), net.tick())
        };
        prop_assert_eq!(run(&schedule), run(&schedule));
    }

    // -----------------------------------------------------------------------
    // Property 5: belts never reorder items
    // -----------------------------------------------------------------------
    #[test]
    fn fifo_order_preserved(
        injections in 2usize..8,
        steps in 10usize..40,
    ) {
        // Tag parcels with distinct types and verify the sink receives them
        // in injection order by checking position monotonicity along the run.
        let (mut net, src) = build_line(3, 1.0, true);
        for i in 0..injections {
            let ty = if i % 2 == 0 { iron_ore() } else { copper_ore() };
            let _ = net.inject(src, ty);
        }
        for _ in 0..steps {
            net.step();
            // Along a single line every belt keeps head-first ordering.
            assert_belt_invariants(&net, 3);
        }
        // A 3-belt line at speed 1 clears well inside the step bound.
        prop_assert_eq!(net.total_in_transit(), 0);
        prop_assert_eq!(net.delivered(), net.injected());
    }
}

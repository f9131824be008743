//! Shared test helpers for integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests and integration tests (via the `test-utils`
//! feature).

use crate::belt::BeltConfig;
use crate::fixed::Fixed64;
use crate::id::ItemTypeId;
use crate::network::Network;
use crate::registry::ItemRegistry;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn copper_ore() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(2)
}

/// A registry with the three test item types defined, in id order.
pub fn test_registry() -> ItemRegistry {
    let mut reg = ItemRegistry::new();
    for name in ["iron_ore", "copper_ore", "coal"] {
        // New registry, fixed names: definition cannot fail.
        let _ = reg.define(name);
    }
    reg
}

// ===========================================================================
// Network and belt constructors
// ===========================================================================

/// A network stepping at 1 second per tick, so a speed-1 belt traverses in
/// exactly one step.
pub fn test_network() -> Network {
    Network::new(test_registry(), fixed(1.0))
}

/// The belt used throughout the tests: 3 items, 0.3 spacing, speed 1.
pub fn test_belt_config() -> BeltConfig {
    BeltConfig::plain(3, fixed(0.3), fixed(1.0))
}

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::cell::Cell as StdCell;
use std::rc::Rc;

new_key_type! {
    /// Identifies a node (port implementor) in the logistics network.
    pub struct NodeId;
}

/// Identifies an item type in the registry. Cheap to copy and compare;
/// ordered so it can key deterministic maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);

/// Identifies a parcel in transit. Stable across belt-to-belt handoffs so a
/// renderer can interpolate the same sprite; carries no simulation meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParcelId(pub u64);

/// Shared parcel id allocator. One per network, handed to each belt segment
/// at construction so ids stay unique across the whole network.
#[derive(Debug, Clone, Default)]
pub struct ParcelIdAlloc(Rc<StdCell<u64>>);

impl ParcelIdAlloc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next parcel id.
    pub fn next_id(&self) -> ParcelId {
        let id = self.0.get();
        self.0.set(id + 1);
        ParcelId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_id_equality() {
        assert_eq!(ItemTypeId(0), ItemTypeId(0));
        assert_ne!(ItemTypeId(0), ItemTypeId(1));
    }

    #[test]
    fn parcel_ids_are_unique_across_clones() {
        let alloc = ParcelIdAlloc::new();
        let other = alloc.clone();
        let a = alloc.next_id();
        let b = other.next_id();
        let c = alloc.next_id();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn item_type_ids_order_by_index() {
        use std::collections::BTreeMap;
        let mut map = BTreeMap::new();
        map.insert(ItemTypeId(2), "coal");
        map.insert(ItemTypeId(0), "iron_ore");
        map.insert(ItemTypeId(1), "iron_plate");
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, [ItemTypeId(0), ItemTypeId(1), ItemTypeId(2)]);
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ItemTypeId(0), "iron_ore");
        map.insert(ItemTypeId(1), "iron_plate");
        assert_eq!(map[&ItemTypeId(0)], "iron_ore");
    }
}

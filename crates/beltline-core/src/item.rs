use crate::fixed::Fixed64;
use crate::grid::WorldPos;
use crate::id::{ItemTypeId, ParcelId};
use serde::{Deserialize, Serialize};

/// A discrete quantity of one item type in transit.
///
/// Parcels are plain values: copied on every transfer, never shared. The
/// display position is stamped with the sender's cell center on each hop so
/// renderers (and the crosser's direction inference) know where the parcel
/// came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemParcel {
    pub item_type: ItemTypeId,
    pub quantity: u32,
    pub display_position: WorldPos,
}

impl ItemParcel {
    pub fn new(item_type: ItemTypeId) -> Self {
        Self {
            item_type,
            quantity: 1,
            display_position: WorldPos::ZERO,
        }
    }

    /// A placeholder parcel used when probing capacity during connection
    /// and direction resolution, where no concrete parcel exists yet.
    pub fn probe() -> Self {
        Self::new(ItemTypeId(0))
    }
}

/// A parcel riding a belt segment: the parcel plus its scalar position along
/// the travel axis, in `[0, 1)` where 1 is the exit end.
///
/// Exclusively owned by the holding segment. Belt-to-belt handoff moves the
/// whole `BeltItem` so the stable `id` survives for display continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltItem {
    pub parcel: ItemParcel,
    pub position: Fixed64,
    pub lane: u8,
    pub id: ParcelId,
}

impl BeltItem {
    pub fn new(parcel: ItemParcel, id: ParcelId) -> Self {
        Self {
            parcel,
            position: Fixed64::ZERO,
            lane: 0,
            id,
        }
    }
}

//! Typed event system with buffered delivery.
//!
//! Events are emitted during the simulation phases and delivered in batch
//! during post-tick. Event kinds can be suppressed, which makes emission a
//! no-op for that kind. Listeners are passive: they observe state but never
//! mutate the network, so delivery order cannot change simulation results.

use crate::fixed::Ticks;
use crate::grid::Cell;
use crate::id::{ItemTypeId, NodeId};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A parcel reached a sink.
    ParcelDelivered {
        node: NodeId,
        item_type: ItemTypeId,
        quantity: u32,
        tick: Ticks,
    },
    /// A parcel was discarded by a Drop-policy filter.
    ParcelDiscarded {
        node: NodeId,
        item_type: ItemTypeId,
        quantity: u32,
        tick: Ticks,
    },
    /// A node was placed on the grid.
    NodePlaced { node: NodeId, cell: Cell, tick: Ticks },
    /// A node was removed; `dropped` counts in-flight parcels lost with it.
    NodeRemoved {
        node: NodeId,
        cell: Cell,
        dropped: u32,
        tick: Ticks,
    },
    /// The path scheduler rebuilt its chain decomposition.
    ChainsRebuilt { chain_count: usize, tick: Ticks },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ParcelDelivered,
    ParcelDiscarded,
    NodePlaced,
    NodeRemoved,
    ChainsRebuilt,
}

const EVENT_KIND_COUNT: usize = 5;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ParcelDelivered { .. } => EventKind::ParcelDelivered,
            Event::ParcelDiscarded { .. } => EventKind::ParcelDiscarded,
            Event::NodePlaced { .. } => EventKind::NodePlaced,
            Event::NodeRemoved { .. } => EventKind::NodeRemoved,
            Event::ChainsRebuilt { .. } => EventKind::ChainsRebuilt,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive, read-only event listener.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Buffered event bus. Emission appends to the buffer; `deliver` drains it
/// to the registered listeners at the post-tick boundary.
#[derive(Default)]
pub struct EventBus {
    buffer: Vec<Event>,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: Vec<(Option<EventKind>, PassiveListener)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffered", &self.buffer.len())
            .field("suppressed", &self.suppressed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    /// Re-enable a suppressed event kind.
    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    /// Register a passive listener. `kind = None` receives every event.
    pub fn on_passive(&mut self, kind: Option<EventKind>, listener: PassiveListener) {
        self.listeners.push((kind, listener));
    }

    /// Buffer an event for delivery at the next post-tick.
    pub fn emit(&mut self, event: Event) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        self.buffer.push(event);
    }

    /// Deliver all buffered events to the registered listeners, in order.
    pub fn deliver(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.buffer);
        for event in &events {
            for (filter, listener) in &mut self.listeners {
                if filter.is_none() || *filter == Some(event.kind()) {
                    listener(event);
                }
            }
        }
    }

    /// Drain the buffer without delivering. Test hook.
    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.buffer)
    }

    /// Number of currently buffered events.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn placed(tick: Ticks) -> Event {
        Event::NodePlaced {
            node: NodeId::default(),
            cell: Cell::new(0, 0),
            tick,
        }
    }

    #[test]
    fn emit_buffers_until_delivery() {
        let mut bus = EventBus::new();
        bus.emit(placed(1));
        bus.emit(placed(2));
        assert_eq!(bus.buffered(), 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.on_passive(
            None,
            Box::new(move |e| sink.borrow_mut().push(e.clone())),
        );
        bus.deliver();
        // Listener registered after emission still sees buffered events.
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(bus.buffered(), 0);
    }

    #[test]
    fn suppressed_kinds_are_never_buffered() {
        let mut bus = EventBus::new();
        bus.suppress(EventKind::NodePlaced);
        bus.emit(placed(1));
        assert_eq!(bus.buffered(), 0);

        bus.unsuppress(EventKind::NodePlaced);
        bus.emit(placed(2));
        assert_eq!(bus.buffered(), 1);
    }

    #[test]
    fn filtered_listener_only_sees_its_kind() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0usize));
        let sink = count.clone();
        bus.on_passive(
            Some(EventKind::ChainsRebuilt),
            Box::new(move |_| *sink.borrow_mut() += 1),
        );
        bus.emit(placed(1));
        bus.emit(Event::ChainsRebuilt {
            chain_count: 3,
            tick: 1,
        });
        bus.deliver();
        assert_eq!(*count.borrow(), 1);
    }
}

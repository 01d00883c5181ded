//! Priority-ordered, single-consumer event bus
//!
//! Every editable entity registers one listener at a priority derived from
//! its interaction mode. A dispatched event visits every listener from
//! highest to lowest priority; at most one of them may consume it. The bus
//! stores opaque listener keys rather than closures, so the caller supplies
//! the callback at dispatch time and keeps full ownership of its state.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Marker a listener returns to claim exclusive handling of the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consume;

/// Priority tiers, lowest to highest. Idle entities must never steal events
/// from an entity mid-gesture, and a selected entity wins ambiguous clicks
/// over unselected siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Fallback,
    Normal,
    Selected,
    Action,
}

impl Priority {
    /// Base dispatch priority of the tier. Tiers are spaced so family and
    /// hover offsets can never cross into the next tier.
    pub fn base(self) -> i32 {
        match self {
            Priority::Fallback => -16,
            Priority::Normal => 0,
            Priority::Selected => 16,
            Priority::Action => 32,
        }
    }
}

/// One synthesized pointer/keyboard event, in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Pointer position in world space
    pub position: Vec2,
    /// Pointer position snapped to the grid
    pub position_in_grid: Vec2,
    /// Left button went down this event
    pub left_clicked: bool,
    /// Right button went down this event
    pub right_clicked: bool,
    /// Left button is currently held
    pub left_down: bool,
    pub shift: bool,
    pub ctrl: bool,
    /// Cancellation key went down this event
    pub escape: bool,
    /// Set by the bus when a listener consumes the event. Listeners observe
    /// the value as it was before their own turn.
    pub consumed: bool,
}

impl PointerEvent {
    /// Event at a bare position with no buttons or modifiers
    pub fn at(position: Vec2, position_in_grid: Vec2) -> Self {
        Self {
            position,
            position_in_grid,
            left_clicked: false,
            right_clicked: false,
            left_down: false,
            shift: false,
            ctrl: false,
            escape: false,
            consumed: false,
        }
    }
}

/// Stable handle to a subscribed listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry<K> {
    id: ListenerId,
    priority: i32,
    key: K,
}

/// Registry of listeners in a total order: priority, then identity.
///
/// Listener keys are plain values (entity handles); the per-event behavior
/// lives in the callback passed to [`EventBus::dispatch`]. Because `dispatch`
/// borrows the bus mutably, no callback can re-enter it, which keeps the
/// listener order stable for the whole pass. Subscription changes requested
/// by a listener are applied by the caller after the pass.
pub struct EventBus<K> {
    /// Sorted ascending by priority; dispatched in reverse. A new listener
    /// is inserted after the last entry of the same or lower priority, so
    /// within one priority the newest listener runs first.
    listeners: Vec<Entry<K>>,
    next_id: u64,
}

impl<K> Default for EventBus<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EventBus<K> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Register a listener key at the given priority
    pub fn subscribe(&mut self, priority: i32, key: K) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let at = self.position_to_insert(priority);
        self.listeners.insert(at, Entry { id, priority, key });

        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|entry| entry.id == id) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => {
                log::error!("listener {id:?} was not found");
                false
            }
        }
    }

    /// Move a listener to a new priority, keeping its identity. The listener
    /// becomes the newest within the target priority.
    pub fn set_priority(&mut self, id: ListenerId, priority: i32) -> bool {
        let Some(index) = self.listeners.iter().position(|entry| entry.id == id) else {
            log::error!("listener {id:?} was not found");
            return false;
        };

        let entry = self.listeners.remove(index);
        let at = self.position_to_insert(priority);
        self.listeners.insert(
            at,
            Entry {
                id: entry.id,
                priority,
                key: entry.key,
            },
        );

        true
    }

    /// First index whose priority exceeds `priority`: inserting there puts
    /// the new listener right of the last entry with the same or lower
    /// priority.
    fn position_to_insert(&self, priority: i32) -> usize {
        self.listeners
            .partition_point(|entry| entry.priority <= priority)
    }
}

impl<K: Copy> EventBus<K> {
    /// Dispatch one event to every listener, highest priority first.
    ///
    /// `callback` is invoked once per listener key and signals intent to
    /// consume by returning `Some(Consume)`. Every listener runs regardless
    /// of earlier consumption; each observes `event.consumed` as left by
    /// strictly higher-priority listeners. A second consumption in one pass
    /// is a protocol violation: two entities claimed overlapping
    /// priority/geometry. It is logged and the extra claim ignored.
    ///
    /// Returns whether the event was consumed.
    pub fn dispatch<F>(&mut self, event: &mut PointerEvent, mut callback: F) -> bool
    where
        F: FnMut(&PointerEvent, K) -> Option<Consume>,
    {
        for index in (0..self.listeners.len()).rev() {
            let key = self.listeners[index].key;

            if callback(event, key) == Some(Consume) {
                if event.consumed {
                    log::error!(
                        "event consumed twice in one dispatch (priority {})",
                        self.listeners[index].priority
                    );
                }

                event.consumed = true;
            }
        }

        event.consumed
    }
}

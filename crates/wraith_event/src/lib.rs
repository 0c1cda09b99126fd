//! # wraith_event - Typed Event Delivery
//!
//! Hands the antagonist engine's outward events (state changes, detections,
//! capture) to whatever presentation, audio or UI layer is listening.
//!
//! - [`EventBus`]: events are queued on publish and dispatched to typed
//!   handlers on [`EventBus::process`], highest priority first
//! - [`EventChannel`]: single-type queue for consumers that prefer to pull

use crossbeam_channel::{Receiver, Sender};
use std::any::{Any, TypeId};
use std::collections::BTreeMap;

/// Delivery priority. Within one priority, publish order is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Anything that can travel through the bus
pub trait Event: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Event for T {}

/// Handle returned by subscribe, used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

type Handler = Box<dyn Fn(&dyn Any) + Send + Sync>;

struct Queued {
    type_id: TypeId,
    payload: Box<dyn Any + Send + Sync>,
    priority: Priority,
}

struct Subscription {
    id: SubscriberId,
    priority: Priority,
    handler: Handler,
}

/// Queued publish/subscribe bus keyed by event type
pub struct EventBus {
    sender: Sender<Queued>,
    receiver: Receiver<Queued>,
    subscriptions: BTreeMap<TypeId, Vec<Subscription>>,
    next_subscriber: u64,
    frame: u64,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            subscriptions: BTreeMap::new(),
            next_subscriber: 1,
            frame: 0,
        }
    }

    /// Queue an event for the next [`process`](Self::process)
    pub fn publish<E: Event>(&self, event: E) {
        self.publish_with_priority(event, Priority::Normal);
    }

    pub fn publish_with_priority<E: Event>(&self, event: E, priority: Priority) {
        let queued = Queued {
            type_id: TypeId::of::<E>(),
            payload: Box::new(event),
            priority,
        };
        // The bus holds the receiver, so sending cannot fail
        let _ = self.sender.send(queued);
    }

    /// Register a handler for events of type `E`
    pub fn subscribe<E: Event, F>(&mut self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_with_priority::<E, F>(handler, Priority::Normal)
    }

    /// Register a handler; higher priority handlers run first
    pub fn subscribe_with_priority<E: Event, F>(
        &mut self,
        handler: F,
        priority: Priority,
    ) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;

        let subscriptions = self.subscriptions.entry(TypeId::of::<E>()).or_default();
        subscriptions.push(Subscription {
            id,
            priority,
            handler: Box::new(move |payload: &dyn Any| {
                if let Some(event) = payload.downcast_ref::<E>() {
                    handler(event);
                }
            }),
        });
        subscriptions.sort_by(|a, b| b.priority.cmp(&a.priority));

        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let mut removed = false;
        for subscriptions in self.subscriptions.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|s| s.id != id);
            removed |= subscriptions.len() != before;
        }
        removed
    }

    /// Number of handlers registered for `E`
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.subscriptions
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver every queued event, returning how many were taken off the
    /// queue (with or without a handler)
    pub fn process(&mut self) -> usize {
        let mut queued: Vec<Queued> = self.receiver.try_iter().collect();
        queued.sort_by(|a, b| b.priority.cmp(&a.priority));

        for event in &queued {
            if let Some(subscriptions) = self.subscriptions.get(&event.type_id) {
                for subscription in subscriptions {
                    (subscription.handler)(event.payload.as_ref());
                }
            }
        }

        self.frame += 1;
        queued.len()
    }

    /// Number of completed [`process`](Self::process) calls
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Drop queued events without delivering them; returns how many
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull-style queue for a single event type.
///
/// Cheap to share behind an `Arc`, so a bus handler can feed it and a
/// host loop can drain it.
pub struct EventChannel<E: Event> {
    sender: Sender<E>,
    receiver: Receiver<E>,
}

impl<E: Event> EventChannel<E> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn send(&self, event: E) {
        let _ = self.sender.send(event);
    }

    /// Next event, if any
    pub fn receive(&self) -> Option<E> {
        self.receiver.try_recv().ok()
    }

    /// Take everything queued, oldest first
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

impl<E: Event> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub mod prelude {
    pub use crate::{Event, EventBus, EventChannel, Priority, SubscriberId};
}

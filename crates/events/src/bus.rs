//! Event bus abstraction for decoupled event emission.
//!
//! Producers hold an [`EventBusRef`] and publish fire-and-forget. Consumers
//! register handlers on a [`LocalEventBus`] and stay subscribed for as long
//! as they hold the returned [`Subscription`].

use crate::GuidanceEvent;
use std::sync::{Arc, Mutex, Weak};

/// Trait for publishing events to subscribers.
pub trait EventBus: Send + Sync {
    /// Publish an event. Never blocks on consumers and returns nothing.
    fn publish(&self, event: &GuidanceEvent);
}

/// Shared handle held by producers.
pub type EventBusRef = Arc<dyn EventBus>;

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&GuidanceEvent) + Send + Sync + 'static>;

struct Entry {
    id: u64,
    topic: Option<&'static str>,
    handler: EventHandler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// In-process one-to-many event bus.
///
/// Handlers run synchronously on the publishing thread, in subscription
/// order, outside the registry lock so a handler may itself subscribe or
/// drop a subscription.
#[derive(Default)]
pub struct LocalEventBus {
    registry: Arc<Mutex<Registry>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&GuidanceEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Receive only events whose [`GuidanceEvent::topic`] equals `topic`.
    pub fn subscribe_topic<F>(&self, topic: &'static str, handler: F) -> Subscription
    where
        F: Fn(&GuidanceEvent) + Send + Sync + 'static,
    {
        self.register(Some(topic), Arc::new(handler))
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn register(&self, topic: Option<&'static str>, handler: EventHandler) -> Subscription {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Entry { id, topic, handler });
        tracing::trace!(id, topic = ?topic, "event subscriber registered");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for LocalEventBus {
    fn publish(&self, event: &GuidanceEvent) {
        let topic = event.topic();
        let handlers: Vec<EventHandler> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.topic.is_none_or(|t| t == topic))
            .map(|e| Arc::clone(&e.handler))
            .collect();

        tracing::trace!(topic, subscribers = handlers.len(), "publishing event");
        for handler in handlers {
            handler(event);
        }
    }
}

/// Owned handle to a bus subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Unsubscribe now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.entries.retain(|e| e.id != self.id);
            tracing::trace!(id = self.id, "event subscriber removed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Event bus that records every published event, in order.
///
/// The capture fake for tests and the simulator.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<GuidanceEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured events.
    pub fn events(&self) -> Vec<GuidanceEvent> {
        self.lock().clone()
    }

    /// Captured events with the given topic.
    pub fn events_for(&self, topic: &str) -> Vec<GuidanceEvent> {
        self.lock()
            .iter()
            .filter(|e| e.topic() == topic)
            .cloned()
            .collect()
    }

    /// Topics of all captured events, in publish order.
    pub fn topics(&self) -> Vec<&'static str> {
        self.lock().iter().map(GuidanceEvent::topic).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GuidanceEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, event: &GuidanceEvent) {
        self.lock().push(event.clone());
    }
}

/// Bus that drops everything; for producers nobody listens to.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _event: &GuidanceEvent) {}
}

//! # Renderable Events
//!
//! Per-instance synchronous event bus carrying host object lifecycle changes
//! to subscribed managers.
//!
//! ```text
//! host ── publish(Added(desc)) ──► EventBus ──► observer.on_event(..)
//!                                     │
//!                                     └──► observer.on_event(..)
//! ```
//!
//! Dispatch happens on the publishing thread, in subscription order. The
//! subscriber list lock is released before any observer runs, so observers
//! may subscribe or unsubscribe while handling an event. Do not publish while
//! holding an observer's lock.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::ObjectId;

/// Lifecycle change of a host renderable object.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderableEvent<D> {
    /// The object was enabled / registered.
    Added(D),
    /// The object was disabled / destroyed.
    Removed(ObjectId),
    /// Per-frame properties changed (transforms, light, fade...).
    PropertyChanged(D),
    /// Materials or renderers changed.
    MaterialChanged(D),
    /// Every derived draw call must be rebuilt.
    AllPropertiesChanged,
}

/// Description of a host object carried by events.
pub trait RenderableDesc: Clone + Send + Sync + 'static {
    /// Host identity of the described object.
    fn object(&self) -> ObjectId;
}

/// Consumes renderable events.
pub trait RenderableObserver<D>: Send {
    /// Handles one event.
    fn on_event(&mut self, event: &RenderableEvent<D>);
}

/// Observer shared between its owner and a bus.
pub type SharedObserver<D> = Arc<Mutex<dyn RenderableObserver<D>>>;

/// Subscription handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscribers<D> {
    next_id: u64,
    entries: Vec<(SubscriptionId, SharedObserver<D>)>,
}

/// Event bus for one category of renderable objects.
pub struct EventBus<D> {
    subscribers: Mutex<Subscribers<D>>,
}

impl<D> Default for EventBus<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for EventBus<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<D> EventBus<D> {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Subscribers {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Adds `observer` to the end of the dispatch order.
    pub fn subscribe(&self, observer: SharedObserver<D>) -> SubscriptionId {
        let mut subscribers = self.subscribers.lock();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.entries.push((id, observer));
        id
    }

    /// Removes a subscription. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.entries.len();
        subscribers.entries.retain(|(entry, _)| *entry != id);
        subscribers.entries.len() != before
    }

    /// Number of subscribed observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.subscribers.lock().entries.len()
    }

    /// Delivers `event` to every observer subscribed at call time.
    pub fn publish(&self, event: &RenderableEvent<D>) {
        let observers: Vec<SharedObserver<D>> = self
            .subscribers
            .lock()
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer.lock().on_event(event);
        }
    }
}

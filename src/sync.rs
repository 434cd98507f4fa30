//! Synchronization events between store instances and tabs
//!
//! A successful write publishes a `SyncEvent` carrying the namespace and its
//! new logical state. Listeners in the same tab receive it directly from the
//! `SyncBus`; other tabs receive the medium's own change notification, which
//! `translate_medium_event` turns back into the same `SyncEvent`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Value, json};

use crate::consts::STORE_EVENT_PREFIX;
use crate::persistence::{Envelope, Namespace};

/// Change notification for one namespace
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    pub namespace: Namespace,
    /// The namespace's state, without envelope metadata
    pub value: Value,
}

impl SyncEvent {
    pub fn new(namespace: Namespace, value: Value) -> Self {
        Self { namespace, value }
    }

    /// `storageSync` payload: `{key, value}`
    pub fn detail(&self) -> Value {
        json!({ "key": self.namespace.as_str(), "value": self.value })
    }

    /// Name of the per-namespace store event (`zustand-<namespace>`)
    pub fn store_event_name(&self) -> String {
        format!("{STORE_EVENT_PREFIX}{}", self.namespace)
    }

    /// Per-namespace store event payload: `{value}`
    pub fn store_event_detail(&self) -> Value {
        json!({ "value": self.value })
    }
}

/// Handle returned by `SyncBus::subscribe`; pass it back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Rc<dyn Fn(&SyncEvent)>;

struct Entry {
    id: u64,
    /// `None` listens to every namespace
    namespace: Option<Namespace>,
    listener: Listener,
}

/// In-process publish/subscribe for `SyncEvent`s
#[derive(Default)]
pub struct SyncBus {
    listeners: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
}

impl SyncBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to events for one namespace
    pub fn subscribe(
        &self,
        namespace: Namespace,
        listener: impl Fn(&SyncEvent) + 'static,
    ) -> Subscription {
        self.add(Some(namespace), Rc::new(listener))
    }

    /// Listen to events for every namespace
    pub fn subscribe_all(&self, listener: impl Fn(&SyncEvent) + 'static) -> Subscription {
        self.add(None, Rc::new(listener))
    }

    /// Returns false if the subscription was already removed
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != subscription.0);
        listeners.len() != before
    }

    /// Deliver `event` to every matching listener.
    ///
    /// Listeners run on a snapshot, so they may publish, subscribe or
    /// unsubscribe while being called.
    pub fn publish(&self, event: &SyncEvent) {
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.namespace.is_none_or(|ns| ns == event.namespace))
            .map(|entry| Rc::clone(&entry.listener))
            .collect();
        log::debug!(
            "Dispatching sync event for {} to {} listener(s)",
            event.namespace,
            targets.len()
        );
        for listener in targets {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn add(&self, namespace: Option<Namespace>, listener: Listener) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push(Entry {
            id,
            namespace,
            listener,
        });
        Subscription(id)
    }
}

/// Translate a native medium change notification into a `SyncEvent`.
///
/// `key` is the physical key and `new_value` the raw stored text, as a
/// browser `StorageEvent` reports them. Returns `None` for foreign keys,
/// removals, and values that are corrupt or expired at `now`.
pub fn translate_medium_event(
    prefix: &str,
    key: Option<&str>,
    new_value: Option<&str>,
    now: f64,
) -> Option<SyncEvent> {
    let namespace = Namespace::from_key(key?.strip_prefix(prefix)?)?;
    let envelope = Envelope::deserialize(new_value?).ok()?;
    if envelope.is_expired(now) {
        return None;
    }
    Some(SyncEvent::new(namespace, envelope.data))
}

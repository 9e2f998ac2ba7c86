//! Component events
//!
//! Two channels:
//! - [`EventBus`]: named publish/subscribe shared between the component and
//!   its active renderer; every subscription is dropped on reload
//! - [`EventEmitter`]: events fired outward to the host, wrapped in
//!   [`EventRecord`]s on a broadcast channel

use crate::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

/// Well-known bus event names
pub mod names {
    pub const ERROR: &str = "ERROR";
    pub const RELOAD: &str = "RELOAD";
    pub const CREATED: &str = "CREATED";
}

/// Bus event handler
pub type Handler = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// Token returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

#[derive(Default)]
struct Subscriptions {
    next_token: u64,
    handlers: HashMap<String, Vec<(SubscriptionToken, Handler)>>,
}

/// Named publish/subscribe bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Subscriptions>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscriptions> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionToken
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        let mut subs = self.lock();
        subs.next_token += 1;
        let token = SubscriptionToken(subs.next_token);
        subs.handlers
            .entry(event.to_string())
            .or_default()
            .push((token, Arc::new(handler)));
        trace!(event, "Subscribed");
        token
    }

    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let mut subs = self.lock();
        for handlers in subs.handlers.values_mut() {
            handlers.retain(|(t, _)| *t != token);
        }
    }

    /// Invoke every handler registered for `event`
    pub fn publish(&self, event: &str, payload: Option<Value>) {
        // Handlers run without the lock held so they may publish or subscribe.
        let handlers: Vec<Handler> = self
            .lock()
            .handlers
            .get(event)
            .map(|hs| hs.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        trace!(event, handlers = handlers.len(), "Publish");
        for handler in handlers {
            handler(payload.as_ref());
        }
    }

    /// Drop every subscription
    pub fn dispose_all(&self) {
        let mut subs = self.lock();
        let count: usize = subs.handlers.values().map(Vec::len).sum();
        subs.handlers.clear();
        debug!(count, "Event subscriptions disposed");
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().handlers.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Events fired outward to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ComponentEvent {
    /// A pipeline run failed
    Error { code: String, message: String },

    /// A renderer asked for a reload
    Reload { state: Option<Value> },

    /// A renderer was instantiated and started
    Created { renderer: String, generation: u64 },

    /// Pipeline state change
    StateChanged { from: PipelineState, to: PipelineState },
}

/// Outward event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ComponentEvent,
}

/// Broadcasts outward events
#[derive(Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<EventRecord>,
    sequence: AtomicU64,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ComponentEvent) {
        let record = EventRecord {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp: Utc::now(),
            event,
        };
        // No receivers is fine
        let _ = self.tx.send(record);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

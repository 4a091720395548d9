//! Global broadcast router for view events

use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Callback invoked for a broadcast event
pub type EventHandler = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

/// Topic → subscribers. A subscriber is identified by the id it registered with.
#[derive(Default)]
pub struct EventRouter {
    handlers: Mutex<HashMap<String, Vec<(Uuid, EventHandler)>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `subscriber` to `event`.
    ///
    /// Returns false and leaves the table untouched if the subscriber is
    /// already registered for this event.
    pub fn register(&self, event: &str, subscriber: Uuid, handler: EventHandler) -> bool {
        let mut handlers = self.handlers.lock().unwrap();
        let entries = handlers.entry(event.to_string()).or_default();
        if entries.iter().any(|(id, _)| *id == subscriber) {
            warn!("Subscriber {} already registered for '{}'", subscriber, event);
            return false;
        }
        entries.push((subscriber, handler));
        true
    }

    /// Remove `subscriber` from `event`. Returns false if it was not registered.
    pub fn unregister(&self, event: &str, subscriber: Uuid) -> bool {
        let mut handlers = self.handlers.lock().unwrap();
        let Some(entries) = handlers.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != subscriber);
        let removed = entries.len() != before;
        if entries.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Deliver an event to every subscriber. Returns how many were called.
    pub fn notify(&self, event: &str, args: &[Value]) -> usize {
        // Handlers may (un)register while running, so call them unlocked
        let targets: Vec<EventHandler> = {
            let handlers = self.handlers.lock().unwrap();
            match handlers.get(event) {
                Some(entries) => entries.iter().map(|(_, handler)| handler.clone()).collect(),
                None => Vec::new(),
            }
        };

        debug!("Broadcasting '{}' to {} subscriber(s)", event, targets.len());
        for handler in &targets {
            handler(event, args);
        }
        targets.len()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Total registrations across all events
    pub fn registration_count(&self) -> usize {
        self.handlers.lock().unwrap().values().map(Vec::len).sum()
    }
}

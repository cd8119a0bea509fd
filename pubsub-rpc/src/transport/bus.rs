//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! In-process event bus.
//!
//! [`EventBus`] implements both halves of the transport boundary in memory,
//! with Node.js `EventEmitter` semantics: handlers run synchronously on the
//! emitting thread, in subscription order. It exists for tests and for
//! embedding a client and a provider in one process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

#[cfg(feature = "observability")]
use tracing::trace;

use crate::Value;
use crate::transport::{EventEmitter, EventHandler, EventListener, same_handler};

/// An in-process publish/subscribe bus.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use pubsub_rpc::transport::{EventBus, EventEmitter, EventHandler, EventListener};
/// use pubsub_rpc::Value;
///
/// let bus = EventBus::new();
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let counter = hits.clone();
/// let handler: EventHandler = Arc::new(move |_args: &[Value]| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.on("ping", handler.clone());
/// bus.emit("ping", vec![Value::from(1)]);
/// bus.remove_listener("ping", &handler);
/// bus.emit("ping", vec![Value::from(2)]);
///
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
    emitted: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bus behind an `Arc`, ready to hand to
    /// [`Emitters::from_bus`](crate::transport::Emitters::from_bus).
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of handlers subscribed to `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.lock().get(event).map_or(0, Vec::len)
    }

    /// Returns the number of events emitted so far, on any channel.
    #[must_use]
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl EventListener for EventBus {
    fn on(&self, event: &str, handler: EventHandler) {
        self.handlers
            .lock()
            .entry(event.to_owned())
            .or_default()
            .push(handler);
    }

    fn remove_listener(&self, event: &str, handler: &EventHandler) {
        let mut handlers = self.handlers.lock();
        if let Some(list) = handlers.get_mut(event) {
            // Node removes the most recently added match
            if let Some(index) = list.iter().rposition(|h| same_handler(h, handler)) {
                list.remove(index);
            }
            if list.is_empty() {
                handlers.remove(event);
            }
        }
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: &str, args: Vec<Value>) {
        self.emitted.fetch_add(1, Ordering::Relaxed);

        // Snapshot so handlers may subscribe or unsubscribe while running.
        let snapshot = match self.handlers.lock().get(event) {
            Some(list) => list.clone(),
            None => return,
        };

        #[cfg(feature = "observability")]
        trace!(event, handlers = snapshot.len(), "emitting event");

        for handler in snapshot {
            handler(&args);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock();
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("handlers", &counts)
            .field("emitted", &self.emitted_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (EventHandler, Arc<Mutex<Vec<Vec<Value>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: EventHandler = Arc::new(move |args: &[Value]| sink.lock().push(args.to_vec()));
        (handler, seen)
    }

    #[test]
    fn test_emit_reaches_subscribers_in_order() {
        let bus = EventBus::new();
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();
        bus.on("ch", first);
        bus.on("ch", second);

        bus.emit("ch", vec![Value::from(1)]);
        bus.emit("ch", vec![Value::from(2)]);
        bus.emit("other", vec![Value::from(3)]);

        assert_eq!(first_seen.lock().len(), 2);
        assert_eq!(*second_seen.lock(), vec![vec![Value::from(1)], vec![Value::from(2)]]);
        assert_eq!(bus.emitted_count(), 3);
    }

    #[test]
    fn test_remove_listener_by_identity() {
        let bus = EventBus::new();
        let (handler, seen) = recorder();
        let (other, _) = recorder();

        bus.on("ch", handler.clone());
        bus.on("ch", handler.clone());
        assert_eq!(bus.listener_count("ch"), 2);

        bus.remove_listener("ch", &other);
        assert_eq!(bus.listener_count("ch"), 2);

        bus.remove_listener("ch", &handler);
        assert_eq!(bus.listener_count("ch"), 1);

        bus.emit("ch", vec![]);
        assert_eq!(seen.lock().len(), 1);

        bus.remove_listener("ch", &handler);
        assert_eq!(bus.listener_count("ch"), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<EventHandler>>> = Arc::new(Mutex::new(None));

        let bus_ref = Arc::downgrade(&bus);
        let slot_ref = slot.clone();
        let handler: EventHandler = Arc::new(move |_: &[Value]| {
            let own = slot_ref.lock().clone();
            if let (Some(bus), Some(own)) = (bus_ref.upgrade(), own) {
                bus.remove_listener("ch", &own);
            }
        });
        *slot.lock() = Some(handler.clone());

        bus.on("ch", handler);
        bus.emit("ch", vec![]);
        assert_eq!(bus.listener_count("ch"), 0);
    }
}

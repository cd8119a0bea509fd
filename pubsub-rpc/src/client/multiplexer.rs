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

//! Shared low-level subscriptions.
//!
//! Many concurrent calls usually listen on the same `(listener, channel)`
//! pair. Subscribing one transport handler per call would make every inbound
//! envelope run N handlers and leak handlers whenever a call is abandoned.
//! The [`ListenerMultiplexer`] keeps at most one handler per pair and fans
//! inbound events out to every call currently interested in it.
//!
//! ```text
//!  transport ──▶ handler(listener, "ch") ──┬──▶ call uid-1
//!                                          ├──▶ call uid-2
//!                                          └──▶ call uid-3
//! ```
//!
//! Entries are reference counted by [`MultiplexerHandle`]s; the last handle
//! released removes the transport handler. Rows hold only a weak reference to
//! their listener, so a dropped transport does not stay alive through the
//! cache; [`ListenerMultiplexer::prune`] clears such rows.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::Value;
use crate::envelope::Uid;
use crate::transport::{EventHandler, EventListener};

/// Raw listener arguments of one inbound event.
pub type EventArgs = Vec<Value>;

type ListenerKey = usize;
type Rows = HashMap<ListenerKey, ListenerRow>;

struct ListenerRow {
    // Distinguishes rows that reuse the address of a reclaimed listener.
    generation: u64,
    listener: Weak<dyn EventListener>,
    channels: HashMap<String, ChannelEntry>,
}

struct ChannelEntry {
    handler: EventHandler,
    ref_count: usize,
    subscribers: HashMap<Uid, mpsc::UnboundedSender<EventArgs>>,
    cached_at: Instant,
    last_accessed: Instant,
}

/// Diagnostics for one `(listener, channel)` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    /// Channels cached for the same listener, this one included.
    pub channels_for_listener: usize,
    /// Live handles on this entry.
    pub ref_count: usize,
    /// Subscribed call sinks.
    pub subscribers: usize,
    /// When the transport handler was registered.
    pub cached_at: Instant,
    /// When a handle was last acquired.
    pub last_accessed: Instant,
}

fn listener_key(listener: &Arc<dyn EventListener>) -> ListenerKey {
    Arc::as_ptr(listener).cast::<()>() as usize
}

/// Cache of low-level subscriptions keyed by listener identity and channel.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::client::ListenerMultiplexer;
/// use pubsub_rpc::envelope::Uid;
/// use pubsub_rpc::transport::{EventBus, EventEmitter, EventListener};
/// use pubsub_rpc::Value;
///
/// let bus = EventBus::shared();
/// let listener: Arc<dyn EventListener> = bus.clone();
/// let multiplexer = ListenerMultiplexer::new();
///
/// let mut first = multiplexer.acquire(&listener, "ch");
/// let mut second = multiplexer.acquire(&listener, "ch");
/// assert_eq!(bus.listener_count("ch"), 1);
///
/// let mut rx = first.subscribe(Uid::new());
/// bus.emit("ch", vec![Value::from(1)]);
/// assert_eq!(rx.try_recv().unwrap(), vec![Value::from(1)]);
///
/// first.release();
/// second.release();
/// assert_eq!(bus.listener_count("ch"), 0);
/// ```
#[derive(Default)]
pub struct ListenerMultiplexer {
    rows: Arc<Mutex<Rows>>,
    generations: AtomicU64,
}

impl ListenerMultiplexer {
    /// Creates an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the entry for `(listener, channel)`, registering
    /// the transport handler if this is the first one.
    pub fn acquire(&self, listener: &Arc<dyn EventListener>, channel: &str) -> MultiplexerHandle {
        let key = listener_key(listener);
        let now = Instant::now();
        let mut rows = self.rows.lock();

        // A dead row at this address belongs to a reclaimed listener.
        if rows
            .get(&key)
            .is_some_and(|row| row.listener.strong_count() == 0)
        {
            rows.remove(&key);
        }

        let row = rows.entry(key).or_insert_with(|| ListenerRow {
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
            listener: Arc::downgrade(listener),
            channels: HashMap::new(),
        });
        let generation = row.generation;

        match row.channels.get_mut(channel) {
            Some(entry) => {
                entry.ref_count += 1;
                entry.last_accessed = now;
            }
            None => {
                let handler = self.fan_out_handler(key, generation, channel);
                // Registered under the lock so a concurrent release cannot
                // remove the entry before its handler exists.
                listener.on(channel, handler.clone());
                row.channels.insert(
                    channel.to_owned(),
                    ChannelEntry {
                        handler,
                        ref_count: 1,
                        subscribers: HashMap::new(),
                        cached_at: now,
                        last_accessed: now,
                    },
                );
            }
        }

        MultiplexerHandle {
            rows: Arc::downgrade(&self.rows),
            key,
            generation,
            channel: channel.to_owned(),
            uids: Vec::new(),
            released: false,
        }
    }

    fn fan_out_handler(&self, key: ListenerKey, generation: u64, channel: &str) -> EventHandler {
        let rows = Arc::downgrade(&self.rows);
        let channel = channel.to_owned();
        Arc::new(move |args: &[Value]| {
            let Some(rows) = rows.upgrade() else {
                return;
            };
            let mut rows = rows.lock();
            let entry = rows
                .get_mut(&key)
                .filter(|row| row.generation == generation)
                .and_then(|row| row.channels.get_mut(&channel));
            if let Some(entry) = entry {
                entry
                    .subscribers
                    .retain(|_, sink| sink.send(args.to_vec()).is_ok());
            }
        })
    }

    /// Returns diagnostics for the `(listener, channel)` entry, if cached.
    #[must_use]
    pub fn stats(&self, listener: &Arc<dyn EventListener>, channel: &str) -> Option<EntryStats> {
        let rows = self.rows.lock();
        let row = rows.get(&listener_key(listener))?;
        let entry = row.channels.get(channel)?;
        Some(EntryStats {
            channels_for_listener: row.channels.len(),
            ref_count: entry.ref_count,
            subscribers: entry.subscribers.len(),
            cached_at: entry.cached_at,
            last_accessed: entry.last_accessed,
        })
    }

    /// Returns the number of listeners with at least one cached channel.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.rows.lock().len()
    }

    /// Drops rows whose listener has been reclaimed. Returns how many were
    /// removed.
    pub fn prune(&self) -> usize {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|_, row| row.listener.strong_count() > 0);
        before - rows.len()
    }
}

impl fmt::Debug for ListenerMultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows.lock();
        let entries: usize = rows.values().map(|row| row.channels.len()).sum();
        f.debug_struct("ListenerMultiplexer")
            .field("listeners", &rows.len())
            .field("entries", &entries)
            .finish()
    }
}

/// One reference on a multiplexer entry.
///
/// Released explicitly with [`release`](Self::release) or on drop.
pub struct MultiplexerHandle {
    rows: Weak<Mutex<Rows>>,
    key: ListenerKey,
    generation: u64,
    channel: String,
    uids: Vec<Uid>,
    released: bool,
}

impl MultiplexerHandle {
    /// Returns the channel this handle listens on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Subscribes a sink for call `uid` and returns its receiving end.
    ///
    /// Every inbound event on the channel is delivered, in order; the caller
    /// filters by correlation id. A released handle returns a receiver that
    /// is already closed.
    pub fn subscribe(&mut self, uid: Uid) -> mpsc::UnboundedReceiver<EventArgs> {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.released {
            return rx;
        }
        if let Some(rows) = self.rows.upgrade() {
            let mut rows = rows.lock();
            let entry = rows
                .get_mut(&self.key)
                .filter(|row| row.generation == self.generation)
                .and_then(|row| row.channels.get_mut(&self.channel));
            if let Some(entry) = entry {
                entry.subscribers.insert(uid.clone(), tx);
                self.uids.push(uid);
            }
        }
        rx
    }

    /// Gives the reference back. Idempotent.
    ///
    /// The last release of an entry removes the transport handler, and the
    /// listener's row once it has no channels left.
    pub fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        let Some(rows) = self.rows.upgrade() else {
            return;
        };
        let mut rows = rows.lock();
        let Some(row) = rows
            .get_mut(&self.key)
            .filter(|row| row.generation == self.generation)
        else {
            return;
        };

        let mut drop_entry = false;
        if let Some(entry) = row.channels.get_mut(&self.channel) {
            for uid in self.uids.drain(..) {
                entry.subscribers.remove(&uid);
            }
            entry.ref_count = entry.ref_count.saturating_sub(1);
            drop_entry = entry.ref_count == 0;
        }

        if drop_entry {
            if let Some(entry) = row.channels.remove(&self.channel) {
                if let Some(listener) = row.listener.upgrade() {
                    listener.remove_listener(&self.channel, &entry.handler);
                }
            }
            if row.channels.is_empty() {
                rows.remove(&self.key);
            }
        }
    }

    /// Returns `true` once the handle was released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for MultiplexerHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MultiplexerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiplexerHandle")
            .field("channel", &self.channel)
            .field("uids", &self.uids)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{EventBus, EventEmitter};

    fn bus_listener() -> (Arc<EventBus>, Arc<dyn EventListener>) {
        let bus = EventBus::shared();
        let listener: Arc<dyn EventListener> = bus.clone();
        (bus, listener)
    }

    #[test]
    fn test_single_transport_handler_per_pair() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let handles: Vec<_> = (0..5).map(|_| multiplexer.acquire(&listener, "ch")).collect();
        assert_eq!(bus.listener_count("ch"), 1);

        let stats = multiplexer.stats(&listener, "ch").unwrap();
        assert_eq!(stats.ref_count, 5);
        assert_eq!(stats.channels_for_listener, 1);

        drop(handles);
        assert_eq!(bus.listener_count("ch"), 0);
        assert!(multiplexer.stats(&listener, "ch").is_none());
        assert_eq!(multiplexer.listener_count(), 0);
    }

    #[test]
    fn test_distinct_channels_get_distinct_handlers() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let a = multiplexer.acquire(&listener, "a");
        let b = multiplexer.acquire(&listener, "b");
        assert_eq!(bus.listener_count("a"), 1);
        assert_eq!(bus.listener_count("b"), 1);
        assert_eq!(
            multiplexer.stats(&listener, "a").unwrap().channels_for_listener,
            2
        );

        drop(a);
        assert_eq!(bus.listener_count("a"), 0);
        assert_eq!(multiplexer.listener_count(), 1);
        drop(b);
        assert_eq!(multiplexer.listener_count(), 0);
    }

    #[test]
    fn test_fan_out_in_order() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let mut first = multiplexer.acquire(&listener, "ch");
        let mut second = multiplexer.acquire(&listener, "ch");
        let mut rx1 = first.subscribe(Uid::from("1"));
        let mut rx2 = second.subscribe(Uid::from("2"));

        for i in 0..3 {
            bus.emit("ch", vec![Value::from(i)]);
        }

        for rx in [&mut rx1, &mut rx2] {
            for i in 0..3 {
                assert_eq!(rx.try_recv().unwrap(), vec![Value::from(i)]);
            }
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let mut first = multiplexer.acquire(&listener, "ch");
        let _second = multiplexer.acquire(&listener, "ch");

        first.release();
        first.release();
        assert!(first.is_released());
        assert_eq!(multiplexer.stats(&listener, "ch").unwrap().ref_count, 1);
        assert_eq!(bus.listener_count("ch"), 1);
    }

    #[test]
    fn test_release_closes_subscriptions() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let mut keep = multiplexer.acquire(&listener, "ch");
        let mut gone = multiplexer.acquire(&listener, "ch");
        let _kept_rx = keep.subscribe(Uid::from("keep"));
        let mut rx = gone.subscribe(Uid::from("gone"));
        assert_eq!(multiplexer.stats(&listener, "ch").unwrap().subscribers, 2);

        gone.release();
        bus.emit("ch", vec![Value::Null]);
        assert!(rx.try_recv().is_err());
        assert_eq!(multiplexer.stats(&listener, "ch").unwrap().subscribers, 1);

        let mut released_rx = gone.subscribe(Uid::from("late"));
        assert!(released_rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receivers_are_forgotten() {
        let (bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let mut handle = multiplexer.acquire(&listener, "ch");
        drop(handle.subscribe(Uid::from("x")));
        bus.emit("ch", vec![]);
        assert_eq!(multiplexer.stats(&listener, "ch").unwrap().subscribers, 0);
    }

    #[test]
    fn test_prune_drops_reclaimed_listeners() {
        let multiplexer = ListenerMultiplexer::new();
        let handle = {
            let (_bus, listener) = bus_listener();
            multiplexer.acquire(&listener, "ch")
        };
        assert_eq!(multiplexer.listener_count(), 1);
        assert_eq!(multiplexer.prune(), 1);
        assert_eq!(multiplexer.listener_count(), 0);

        // Releasing after the row is gone is harmless.
        drop(handle);
    }

    #[test]
    fn test_stale_handle_leaves_successor_row_alone() {
        let multiplexer = ListenerMultiplexer::new();
        let stale = {
            let (_bus, listener) = bus_listener();
            multiplexer.acquire(&listener, "ch")
        };
        assert_eq!(multiplexer.prune(), 1);

        // The fresh bus may land on the reclaimed allocation.
        let (bus, listener) = bus_listener();
        let mut live = multiplexer.acquire(&listener, "ch");
        let mut rx = live.subscribe(Uid::from("live"));

        drop(stale);
        assert_eq!(bus.listener_count("ch"), 1);
        assert_eq!(multiplexer.stats(&listener, "ch").unwrap().ref_count, 1);
        bus.emit("ch", vec![Value::from(1)]);
        assert_eq!(rx.try_recv().unwrap(), vec![Value::from(1)]);

        live.release();
        assert_eq!(bus.listener_count("ch"), 0);
    }

    #[test]
    fn test_last_accessed_advances() {
        let (_bus, listener) = bus_listener();
        let multiplexer = ListenerMultiplexer::new();

        let _a = multiplexer.acquire(&listener, "ch");
        let created = multiplexer.stats(&listener, "ch").unwrap();
        let _b = multiplexer.acquire(&listener, "ch");
        let touched = multiplexer.stats(&listener, "ch").unwrap();
        assert_eq!(created.cached_at, touched.cached_at);
        assert!(touched.last_accessed >= created.last_accessed);
    }
}

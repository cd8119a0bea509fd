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

//! Transport boundary traits.

use std::sync::Arc;

use crate::Value;

/// Callback registered for a named event.
///
/// Handlers are compared by pointer identity, so the same `Arc` must be passed
/// to [`EventListener::remove_listener`] that was passed to
/// [`EventListener::on`].
pub type EventHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// The subscribing half of a publish/subscribe channel.
///
/// Implementations must tolerate `on` and `remove_listener` being called from
/// within a running handler. Handlers must not be invoked while the
/// implementation holds a lock that `on`/`remove_listener` also take.
pub trait EventListener: Send + Sync {
    /// Subscribes `handler` to `event`.
    fn on(&self, event: &str, handler: EventHandler);

    /// Removes one subscription of `handler` from `event`, if present.
    fn remove_listener(&self, event: &str, handler: &EventHandler);
}

/// The publishing half of a publish/subscribe channel.
pub trait EventEmitter: Send + Sync {
    /// Publishes `args` to every handler subscribed to `event`.
    ///
    /// Delivery is best effort; no error is reported.
    fn emit(&self, event: &str, args: Vec<Value>);
}

/// Returns `true` when both handlers are the same allocation.
#[must_use]
pub fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_handler_is_identity() {
        let a: EventHandler = Arc::new(|_: &[Value]| {});
        let b: EventHandler = Arc::new(|_: &[Value]| {});
        assert!(same_handler(&a, &a.clone()));
        assert!(!same_handler(&a, &b));
    }
}

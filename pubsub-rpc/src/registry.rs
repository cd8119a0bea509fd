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

//! Shared state of one or more services.
//!
//! A [`Registry`] owns the [`ListenerMultiplexer`] and the call and
//! invocation counters. Services created with
//! [`Service::new`](crate::Service::new) get a registry of their own; pass
//! the same `Arc<Registry>` to [`Service::with_registry`](crate::Service::with_registry)
//! to let several services share low-level subscriptions.

mod metrics;

pub use self::metrics::{CallMetrics, InvocationMetrics};

use crate::client::ListenerMultiplexer;

/// Multiplexer and diagnostics shared by services.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::registry::Registry;
///
/// let registry = Arc::new(Registry::new());
/// assert_eq!(registry.multiplexer().listener_count(), 0);
/// assert_eq!(registry.call_metrics().total_started(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    multiplexer: ListenerMultiplexer,
    calls: CallMetrics,
    invocations: InvocationMetrics,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the listener multiplexer.
    #[must_use]
    pub const fn multiplexer(&self) -> &ListenerMultiplexer {
        &self.multiplexer
    }

    /// Returns the client-side call counters.
    #[must_use]
    pub const fn call_metrics(&self) -> &CallMetrics {
        &self.calls
    }

    /// Returns the provider-side invocation counters.
    #[must_use]
    pub const fn invocation_metrics(&self) -> &InvocationMetrics {
        &self.invocations
    }
}

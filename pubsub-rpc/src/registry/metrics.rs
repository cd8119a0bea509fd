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

//! Call and invocation counters.
//!
//! Counters are plain atomics readable at any time. With the `observability`
//! feature they are also exported through the `metrics` facade under the
//! `pubsub_rpc.` prefix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Client-side call counters.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use pubsub_rpc::registry::CallMetrics;
///
/// let metrics = CallMetrics::new();
/// metrics.record_call_started();
/// metrics.record_call_completed(Duration::from_millis(4));
/// assert_eq!(metrics.active_calls(), 0);
/// assert_eq!(metrics.average_latency(), Some(Duration::from_millis(4)));
/// ```
#[derive(Debug, Default)]
pub struct CallMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    total_latency_us: AtomicU64,
    latency_count: AtomicU64,
}

impl CallMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request being emitted.
    pub fn record_call_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("pubsub_rpc.calls.started").increment(1);
            metrics::gauge!("pubsub_rpc.calls.active").increment(1.0);
        }
    }

    /// Records a call ending with `complete`, after `latency`.
    pub fn record_call_completed(&self, latency: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("pubsub_rpc.calls.completed").increment(1);
            metrics::gauge!("pubsub_rpc.calls.active").decrement(1.0);
        }
    }

    /// Records a call ending with an `error` response.
    pub fn record_call_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("pubsub_rpc.calls.failed").increment(1);
            metrics::gauge!("pubsub_rpc.calls.active").decrement(1.0);
        }
    }

    /// Records a call ending by timeout.
    pub fn record_call_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("pubsub_rpc.calls.timed_out").increment(1);
            metrics::gauge!("pubsub_rpc.calls.active").decrement(1.0);
        }
    }

    /// Records a call ended by its finish signal or by the caller dropping it.
    pub fn record_call_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("pubsub_rpc.calls.cancelled").increment(1);
            metrics::gauge!("pubsub_rpc.calls.active").decrement(1.0);
        }
    }

    fn record_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(micros, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::histogram!("pubsub_rpc.calls.latency_us").record(micros as f64);
    }

    /// Calls started and not yet ended.
    #[must_use]
    pub fn active_calls(&self) -> u64 {
        let ended = self.completed.load(Ordering::Relaxed)
            + self.failed.load(Ordering::Relaxed)
            + self.timed_out.load(Ordering::Relaxed)
            + self.cancelled.load(Ordering::Relaxed);
        self.started.load(Ordering::Relaxed).saturating_sub(ended)
    }

    /// Total calls started.
    #[must_use]
    pub fn total_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Total calls completed.
    #[must_use]
    pub fn total_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Total calls failed remotely.
    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Total calls timed out.
    #[must_use]
    pub fn total_timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    /// Total calls cancelled.
    #[must_use]
    pub fn total_cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Mean time from request to `complete`, if any call completed.
    #[must_use]
    pub fn average_latency(&self) -> Option<Duration> {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let total = self.total_latency_us.load(Ordering::Relaxed);
        Some(Duration::from_micros(total / count))
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.started.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.timed_out.store(0, Ordering::Relaxed);
        self.cancelled.store(0, Ordering::Relaxed);
        self.total_latency_us.store(0, Ordering::Relaxed);
        self.latency_count.store(0, Ordering::Relaxed);
    }
}

/// Provider-side invocation counters.
#[derive(Debug, Default)]
pub struct InvocationMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    rejected: AtomicU64,
}

impl InvocationMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an action being invoked.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("pubsub_rpc.invocations.started").increment(1);
    }

    /// Records an action completing.
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("pubsub_rpc.invocations.completed").increment(1);
    }

    /// Records an action failing or panicking.
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("pubsub_rpc.invocations.failed").increment(1);
    }

    /// Records an invocation aborted by a cancel envelope or deregistration.
    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("pubsub_rpc.invocations.cancelled").increment(1);
    }

    /// Records a request answered with an error before any action ran.
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("pubsub_rpc.invocations.rejected").increment(1);
    }

    /// Total invocations started.
    #[must_use]
    pub fn total_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Total invocations completed.
    #[must_use]
    pub fn total_completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Total invocations failed.
    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Total invocations cancelled.
    #[must_use]
    pub fn total_cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Total requests rejected.
    #[must_use]
    pub fn total_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

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

//! Per-call options.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use crate::RemoteError;
use crate::logging::SharedLogger;
use crate::serialization::Serialization;
use crate::transport::OnEventResolver;

/// Runs every delivery of a call to its caller.
///
/// The wrapper receives the delivery as a closure and must call it exactly
/// once, for example after entering a UI framework's change-detection zone.
/// The end of a call is a delivery too.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::client::NotificationWrapper;
///
/// let wrapper: NotificationWrapper = Arc::new(|deliver: &mut dyn FnMut()| {
///     deliver();
/// });
/// ```
pub type NotificationWrapper = Arc<dyn Fn(&mut dyn FnMut()) + Send + Sync>;

/// A caller-owned signal that ends a call early.
///
/// Resolving (`Ok`) ends a stream normally; rejecting (`Err`) ends it with
/// [`CallError::AbortedByFinishSignal`](crate::CallError::AbortedByFinishSignal)
/// carrying the rejection. Either way the provider receives a cancel envelope.
/// One signal may be shared by many calls.
///
/// # Example
///
/// ```rust
/// use pubsub_rpc::client::FinishSignal;
///
/// let (trigger, signal) = FinishSignal::pair();
/// let same_signal = signal.clone();
/// trigger.finish();
/// # drop(same_signal);
/// ```
#[derive(Clone)]
pub struct FinishSignal {
    inner: Shared<BoxFuture<'static, Result<(), RemoteError>>>,
}

impl FinishSignal {
    /// Wraps any future.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), RemoteError>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Creates a signal settled by the returned trigger.
    ///
    /// Dropping the trigger without settling leaves the signal pending
    /// forever.
    #[must_use]
    pub fn pair() -> (FinishTrigger, Self) {
        let (tx, rx) = oneshot::channel();
        let signal = Self::new(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => futures::future::pending().await,
            }
        });
        (FinishTrigger { tx }, signal)
    }

    /// Waits for the signal to settle.
    pub(crate) async fn settled(self) -> Result<(), RemoteError> {
        self.inner.await
    }
}

impl fmt::Debug for FinishSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishSignal")
            .field("settled", &self.inner.peek().is_some())
            .finish()
    }
}

/// Settles the [`FinishSignal`] it was created with.
#[derive(Debug)]
pub struct FinishTrigger {
    tx: oneshot::Sender<Result<(), RemoteError>>,
}

impl FinishTrigger {
    /// Resolves the signal.
    pub fn finish(self) {
        let _ = self.tx.send(Ok(()));
    }

    /// Rejects the signal with `error`.
    pub fn fail(self, error: RemoteError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Options of one call. Unset fields fall back to the service configuration.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use pubsub_rpc::client::CallOptions;
/// use pubsub_rpc::serialization::Serialization;
///
/// let defaults = CallOptions::new().with_timeout(Duration::from_secs(1));
/// let overrides = CallOptions::new().with_serialization(Serialization::JsonRefs);
///
/// let merged = overrides.merged_over(&defaults);
/// assert_eq!(merged.timeout, Some(Duration::from_secs(1)));
/// assert_eq!(merged.serialization, Some(Serialization::JsonRefs));
/// ```
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Time allowed until the first response.
    pub timeout: Option<Duration>,
    /// Signal ending the call early.
    pub finish_signal: Option<FinishSignal>,
    /// Channel to listen on for responses.
    pub listen_channel: Option<String>,
    /// Strategy the provider must encode `data` with.
    pub serialization: Option<Serialization>,
    /// Wrapper around deliveries.
    pub notification_wrapper: Option<NotificationWrapper>,
    /// Extracts envelopes from raw listener arguments.
    pub on_event_resolver: Option<OnEventResolver>,
    /// Logger for this call.
    pub logger: Option<SharedLogger>,
}

/// Per-call options merged over a [`Caller`](crate::client::Caller)'s
/// defaults.
pub type CallOverrides = CallOptions;

impl CallOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the finish signal.
    #[must_use]
    pub fn with_finish_signal(mut self, signal: FinishSignal) -> Self {
        self.finish_signal = Some(signal);
        self
    }

    /// Sets the listen channel.
    #[must_use]
    pub fn with_listen_channel(mut self, channel: impl Into<String>) -> Self {
        self.listen_channel = Some(channel.into());
        self
    }

    /// Sets the serialization strategy.
    #[must_use]
    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = Some(serialization);
        self
    }

    /// Sets the notification wrapper.
    #[must_use]
    pub fn with_notification_wrapper(mut self, wrapper: NotificationWrapper) -> Self {
        self.notification_wrapper = Some(wrapper);
        self
    }

    /// Sets the on-event resolver.
    #[must_use]
    pub fn with_on_event_resolver(mut self, resolver: OnEventResolver) -> Self {
        self.on_event_resolver = Some(resolver);
        self
    }

    /// Sets the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns these options with unset fields taken from `defaults`.
    #[must_use]
    pub fn merged_over(self, defaults: &CallOptions) -> CallOptions {
        CallOptions {
            timeout: self.timeout.or(defaults.timeout),
            finish_signal: self.finish_signal.or_else(|| defaults.finish_signal.clone()),
            listen_channel: self
                .listen_channel
                .or_else(|| defaults.listen_channel.clone()),
            serialization: self.serialization.or(defaults.serialization),
            notification_wrapper: self
                .notification_wrapper
                .or_else(|| defaults.notification_wrapper.clone()),
            on_event_resolver: self
                .on_event_resolver
                .or_else(|| defaults.on_event_resolver.clone()),
            logger: self.logger.or_else(|| defaults.logger.clone()),
        }
    }
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("timeout", &self.timeout)
            .field("finish_signal", &self.finish_signal)
            .field("listen_channel", &self.listen_channel)
            .field("serialization", &self.serialization)
            .field("notification_wrapper", &self.notification_wrapper.is_some())
            .field("on_event_resolver", &self.on_event_resolver.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

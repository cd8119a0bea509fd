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

//! The calling side.
//!
//! A [`Client`] turns an action name and positional arguments into a
//! request envelope on the service channel, and the matching response
//! envelopes into a [`Reply`]:
//!
//! | Output mode | Reply |
//! |-------------|-------|
//! | [`Single`](OutputMode::Single) | [`SingleReply`], a future of the first value |
//! | [`Stream`](OutputMode::Stream) | [`StreamReply`], a stream of every value |
//! | [`Subscription`](OutputMode::Subscription) | [`SubscriptionReply`], pushing to an [`Observer`] |
//!
//! Responses are correlated by a fresh uid per call. Calls sharing a
//! listener and listen channel share one transport subscription through the
//! registry's [`ListenerMultiplexer`].
//!
//! Each call ends exactly once: on a terminal response, on its timeout
//! (sending an `unsubscribe-request` with reason `timeout`), on its finish
//! signal (reason `finish-signal`), or when the caller drops the reply.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pubsub_rpc::{ApiDefinition, Registry, ServiceConfig, Value};
//! use pubsub_rpc::client::{CallOptions, Client};
//! use pubsub_rpc::transport::EventBus;
//!
//! # async fn example() -> Result<(), pubsub_rpc::CallError> {
//! let bus = EventBus::shared();
//! let api = Arc::new(ApiDefinition::new().single("getUser"));
//! let client = Client::new(&ServiceConfig::new("users"), api, Arc::new(Registry::new()));
//!
//! let reply = client
//!     .call("getUser", CallOptions::new(), &bus)
//!     .invoke(vec![Value::from(42)]);
//! let user = reply.into_single().expect("declared single").await?;
//! # let _ = user;
//! # Ok(())
//! # }
//! ```

mod caller;
mod driver;
mod multiplexer;
mod options;
mod reply;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use caller::Caller;
pub use multiplexer::{EntryStats, EventArgs, ListenerMultiplexer, MultiplexerHandle};
pub use options::{CallOptions, CallOverrides, FinishSignal, FinishTrigger, NotificationWrapper};
pub use reply::{Observer, Reply, SingleReply, StreamReply, Subscription, SubscriptionReply};

use crate::api::{ApiDefinition, OutputMode};
use crate::config::ServiceConfig;
use crate::logging::{MODULE_PREFIX, PrefixedLogger, SharedLogger};
use crate::registry::Registry;
use crate::serialization::Serialization;
use crate::transport::{EmittersSource, default_resolver};
use crate::value::Value;

use driver::PendingCall;

const CLIENT_PREFIX: &str = "[client]";

struct ClientInner {
    channel: String,
    listen_channel: String,
    default_timeout: Duration,
    serialization: Option<Serialization>,
    api: Arc<ApiDefinition>,
    registry: Arc<Registry>,
    logger: SharedLogger,
}

/// Issues calls against one service channel.
///
/// Cheap to clone; clones share configuration and registry.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

fn scoped(logger: &SharedLogger) -> SharedLogger {
    PrefixedLogger::scoped(&PrefixedLogger::scoped(logger, MODULE_PREFIX), CLIENT_PREFIX)
}

impl Client {
    /// Creates a client. `config` is expected to be valid.
    pub fn new(config: &ServiceConfig, api: Arc<ApiDefinition>, registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                channel: config.channel.clone(),
                listen_channel: config.effective_listen_channel().to_owned(),
                default_timeout: config.default_timeout,
                serialization: config.serialization,
                api,
                registry,
                logger: scoped(&config.logger),
            }),
        }
    }

    /// Prepares a call of `name` over `emitters`.
    ///
    /// Nothing is sent until the returned call is invoked and its reply
    /// polled.
    #[must_use]
    pub fn call(
        &self,
        name: &str,
        options: CallOptions,
        emitters: impl Into<EmittersSource>,
    ) -> BoundCall {
        BoundCall {
            client: self.clone(),
            name: name.to_owned(),
            mode: self.inner.api.mode_of(name),
            options,
            source: emitters.into(),
        }
    }

    /// Returns the registry calls record into.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Returns the channel requests are emitted on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.inner.channel
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("channel", &self.inner.channel)
            .field("listen_channel", &self.inner.listen_channel)
            .field("default_timeout", &self.inner.default_timeout)
            .field("serialization", &self.inner.serialization)
            .field("actions", &self.inner.api.len())
            .finish()
    }
}

/// A call with its action, options and transport fixed, waiting for
/// arguments.
///
/// Can be invoked any number of times; each invocation is a separate call
/// with its own uid.
#[derive(Clone)]
pub struct BoundCall {
    client: Client,
    name: String,
    mode: OutputMode,
    options: CallOptions,
    source: EmittersSource,
}

impl BoundCall {
    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the output mode the reply will have.
    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Invokes the action with positional `args`.
    ///
    /// An empty vector sends `args: []`.
    #[must_use]
    pub fn invoke(&self, args: Vec<Value>) -> Reply {
        let inner = &self.client.inner;
        let options = &self.options;
        let call = PendingCall {
            name: self.name.clone(),
            args,
            channel: inner.channel.clone(),
            listen_channel: options
                .listen_channel
                .clone()
                .unwrap_or_else(|| inner.listen_channel.clone()),
            timeout: options.timeout.unwrap_or(inner.default_timeout),
            finish_signal: options.finish_signal.clone(),
            serialization: options.serialization.or(inner.serialization),
            wrapper: options.notification_wrapper.clone(),
            resolver: options
                .on_event_resolver
                .clone()
                .unwrap_or_else(default_resolver),
            logger: options
                .logger
                .as_ref()
                .map_or_else(|| inner.logger.clone(), scoped),
            source: self.source.clone(),
            registry: inner.registry.clone(),
        };
        match self.mode {
            OutputMode::Single => Reply::Single(SingleReply::new(call)),
            OutputMode::Stream => Reply::Stream(StreamReply::new(call)),
            OutputMode::Subscription => Reply::Subscription(SubscriptionReply::new(call)),
        }
    }
}

impl fmt::Debug for BoundCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCall")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

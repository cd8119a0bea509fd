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

//! The answering side.
//!
//! A [`Provider`] registers a set of [`Actions`] on the service channel of a
//! transport. Every `request` envelope naming a registered action starts an
//! invocation; its results go back as `response` envelopes on the same
//! channel: one `data` per value, then `complete`, or a single `error`.
//!
//! An `unsubscribe-request` for a running invocation aborts it without a
//! response. [`Registration::deregister`] removes the listener and aborts
//! every invocation still running.
//!
//! Requests that cannot be served are answered with an error naming the
//! reason:
//!
//! | Name | Cause |
//! |------|-------|
//! | `UnknownAction` | no action with the requested name |
//! | `UnsupportedActionResultType` | the action returned [`ActionResult::Unsupported`] |
//! | `RemoteActionError` | the action panicked |
//! | `SerializationError` | unknown serialization tag, or a value failed to encode |

mod action;
mod dispatch;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;

pub use action::{Action, ActionContext, ActionResult, Actions};

use crate::config::ServiceConfig;
use crate::logging::{MODULE_PREFIX, PrefixedLogger, SharedLogger};
use crate::registry::Registry;
use crate::transport::{
    Emitters, EventHandler, EventListener, OnEventResolver, default_resolver,
};
use crate::value::Value;

use dispatch::Dispatch;

const PROVIDER_PREFIX: &str = "[provider]";

fn scoped(logger: &SharedLogger) -> SharedLogger {
    PrefixedLogger::scoped(&PrefixedLogger::scoped(logger, MODULE_PREFIX), PROVIDER_PREFIX)
}

/// Options of one registration.
#[derive(Clone, Default)]
pub struct RegisterOptions {
    /// Extracts the envelope, and optionally a reply emitter, from raw
    /// listener arguments. Defaults to the first argument and the
    /// registered emitter.
    pub on_event_resolver: Option<OnEventResolver>,
    /// Logger for this registration instead of the service's.
    pub logger: Option<SharedLogger>,
}

impl RegisterOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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
}

impl fmt::Debug for RegisterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterOptions")
            .field("on_event_resolver", &self.on_event_resolver.is_some())
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Registers actions on one service channel.
#[derive(Clone)]
pub struct Provider {
    channel: String,
    registry: Arc<Registry>,
    logger: SharedLogger,
}

impl Provider {
    /// Creates a provider for `config.channel`.
    pub fn new(config: &ServiceConfig, registry: Arc<Registry>) -> Self {
        Self {
            channel: config.channel.clone(),
            registry,
            logger: config.logger.clone(),
        }
    }

    /// Starts answering requests for `actions` arriving on `emitters`.
    ///
    /// Invocations run on the Tokio runtime this is called from, whichever
    /// thread the transport delivers events on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn register(
        &self,
        actions: Actions,
        emitters: impl Into<Emitters>,
        options: RegisterOptions,
    ) -> Registration {
        let Emitters { emitter, listener } = emitters.into();
        let logger = scoped(options.logger.as_ref().unwrap_or(&self.logger));
        logger.info(format_args!("register()"));

        let dispatch = Arc::new(Dispatch {
            channel: self.channel.clone(),
            actions,
            emitter,
            resolver: options.on_event_resolver.unwrap_or_else(default_resolver),
            invocations: Mutex::new(HashMap::new()),
            registry: self.registry.clone(),
            runtime: Handle::current(),
            logger,
        });

        let target = dispatch.clone();
        let handler: EventHandler = Arc::new(move |args: &[Value]| target.handle(args));
        listener.on(&self.channel, handler.clone());
        dispatch.logger.info(format_args!(
            "registered, actions: {:?}",
            dispatch.actions.names().collect::<Vec<_>>()
        ));

        Registration {
            dispatch,
            listener,
            handler,
            registered: AtomicBool::new(true),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Resource usage of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationStats {
    /// Invocations started and not yet finished or aborted.
    pub active_invocations: usize,
}

/// A live registration.
///
/// Dropping it deregisters.
pub struct Registration {
    dispatch: Arc<Dispatch>,
    listener: Arc<dyn EventListener>,
    handler: EventHandler,
    registered: AtomicBool,
}

impl Registration {
    /// Stops answering requests and aborts running invocations.
    ///
    /// Aborted invocations send nothing. Calling this twice is a no-op.
    pub fn deregister(&self) {
        if !self.registered.swap(false, Ordering::AcqRel) {
            return;
        }
        self.listener
            .remove_listener(&self.dispatch.channel, &self.handler);
        let aborted = self.dispatch.abort_all();
        self.dispatch.logger.info(format_args!(
            "deregistered, aborted invocations: {aborted}"
        ));
    }

    /// Returns `true` until [`deregister`](Self::deregister) is called.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Returns current resource usage.
    #[must_use]
    pub fn stats(&self) -> RegistrationStats {
        RegistrationStats {
            active_invocations: self.dispatch.active_invocations(),
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("channel", &self.dispatch.channel)
            .field("registered", &self.is_registered())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::stream;

    use crate::envelope::{
        CancelEnvelope, CancelReason, Envelope, RequestEnvelope, ResponseBody, Uid,
    };
    use crate::error::RemoteError;
    use crate::logging::LogLevel;
    use crate::logging::tests::RecordingLogger;
    use crate::serialization::Serialization;
    use crate::transport::{EventBus, EventEmitter};

    fn provider() -> Provider {
        Provider::new(&ServiceConfig::new("svc"), Arc::new(Registry::new()))
    }

    fn responses(bus: &Arc<EventBus>) -> Arc<Mutex<Vec<(Uid, ResponseBody)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: EventHandler = Arc::new(move |args: &[Value]| {
            if let Ok(Envelope::Response(response)) = Envelope::from_value(&args[0]) {
                sink.lock().push((response.uid, response.body));
            }
        });
        bus.on("svc", handler);
        seen
    }

    fn request(bus: &EventBus, uid: &str, name: &str, args: Vec<Value>) {
        let request = RequestEnvelope {
            uid: Uid::from(uid),
            name: name.into(),
            args,
            serialization: None,
        };
        bus.emit("svc", vec![request.into_value()]);
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_future_answers_data_then_complete() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let registration = provider().register(
            Actions::new().with_future("echo", |_ctx, args| async move { Ok(args[0].clone()) }),
            &bus,
            RegisterOptions::new(),
        );

        request(&bus, "u1", "echo", vec![Value::from("hi")]);
        settle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(matches!(&seen[0].1, ResponseBody::Data(value) if value.as_str() == Some("hi")));
        assert_eq!(seen[1].1, ResponseBody::Complete);
        assert_eq!(registration.stats().active_invocations, 0);
    }

    #[tokio::test]
    async fn test_unknown_action_is_answered_with_error() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let _registration = provider().register(Actions::new(), &bus, RegisterOptions::new());

        request(&bus, "u1", "missing", Vec::new());

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let ResponseBody::Error(error) = &seen[0].1 else {
            panic!("expected an error response");
        };
        assert_eq!(RemoteError::from_value(error).name, RemoteError::UNKNOWN_ACTION);
    }

    #[tokio::test]
    async fn test_unsupported_result_is_answered_with_error() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let _registration = provider().register(
            Actions::new().with("odd", |_ctx, _args| ActionResult::Unsupported),
            &bus,
            RegisterOptions::new(),
        );

        request(&bus, "u1", "odd", Vec::new());

        let seen = seen.lock();
        let ResponseBody::Error(error) = &seen[0].1 else {
            panic!("expected an error response");
        };
        assert_eq!(RemoteError::from_value(error).name, RemoteError::UNSUPPORTED_RESULT);
    }

    #[tokio::test]
    async fn test_panics_become_error_responses() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let _registration = provider().register(
            Actions::new()
                .with("eager", |_ctx, _args| panic!("boom at call"))
                .with_future("lazy", |_ctx, args: Vec<Value>| async move {
                    if args.is_empty() {
                        panic!("boom while polling");
                    }
                    Ok(Value::Null)
                }),
            &bus,
            RegisterOptions::new(),
        );

        request(&bus, "u1", "eager", Vec::new());
        request(&bus, "u2", "lazy", Vec::new());
        settle().await;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        for (_, body) in seen.iter() {
            let ResponseBody::Error(error) = body else {
                panic!("expected an error response");
            };
            let error = RemoteError::from_value(error);
            assert_eq!(error.name, RemoteError::ACTION_PANIC);
            assert!(error.message.starts_with("boom"));
        }
    }

    #[tokio::test]
    async fn test_unknown_serialization_is_answered_with_error() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let _registration = provider().register(
            Actions::new().with_future("echo", |_ctx, _args| async { Ok(Value::Null) }),
            &bus,
            RegisterOptions::new(),
        );

        let mut payload = RequestEnvelope {
            uid: Uid::from("u1"),
            name: "echo".into(),
            args: Vec::new(),
            serialization: Some(Serialization::JsonRefs),
        }
        .into_value();
        if let Value::Object(map) = &mut payload {
            std::sync::Arc::make_mut(map).insert("serialization".into(), Value::from("yaml"));
        }
        bus.emit("svc", vec![payload]);

        let seen = seen.lock();
        let ResponseBody::Error(error) = &seen[0].1 else {
            panic!("expected an error response");
        };
        assert_eq!(RemoteError::from_value(error).name, RemoteError::SERIALIZATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_without_response() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        let registration = provider().register(
            Actions::new().with_stream("ticks", |_ctx, _args| {
                stream::unfold(0_i64, |n| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Some((Ok(Value::from(n)), n + 1))
                })
            }),
            &bus,
            RegisterOptions::new(),
        );

        request(&bus, "u1", "ticks", Vec::new());
        settle().await;
        assert_eq!(registration.stats().active_invocations, 1);

        let cancel = CancelEnvelope {
            uid: Uid::from("u1"),
            name: "ticks".into(),
            reason: CancelReason::Timeout,
        };
        bus.emit("svc", vec![cancel.into_value()]);
        assert_eq!(registration.stats().active_invocations, 0);

        let before = seen.lock().len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.lock().len(), before);
    }

    #[tokio::test]
    async fn test_invocation_is_forgotten_before_complete_is_sent() {
        let bus = EventBus::shared();
        let slot: Arc<Mutex<Option<Arc<Registration>>>> = Arc::new(Mutex::new(None));
        let active_at_complete = Arc::new(Mutex::new(None));
        {
            let slot = slot.clone();
            let active_at_complete = active_at_complete.clone();
            let handler: EventHandler = Arc::new(move |args: &[Value]| {
                if let Ok(Envelope::Response(response)) = Envelope::from_value(&args[0]) {
                    if response.body == ResponseBody::Complete {
                        let active = slot.lock().as_ref().map(|r| r.stats().active_invocations);
                        *active_at_complete.lock() = active;
                    }
                }
            });
            bus.on("svc", handler);
        }
        let registration = Arc::new(provider().register(
            Actions::new().with_future("echo", |_ctx, _args| async { Ok(Value::Null) }),
            &bus,
            RegisterOptions::new(),
        ));
        *slot.lock() = Some(registration.clone());

        request(&bus, "u1", "echo", Vec::new());
        settle().await;

        assert_eq!(*active_at_complete.lock(), Some(0));
        slot.lock().take();
    }

    #[tokio::test]
    async fn test_replaced_invocation_keeps_successor_cancellable() {
        let bus = EventBus::shared();
        let seen = responses(&bus);
        {
            // Reuses the uid while the first invocation is emitting its value.
            let weak = Arc::downgrade(&bus);
            let handler: EventHandler = Arc::new(move |args: &[Value]| {
                let Ok(Envelope::Response(response)) = Envelope::from_value(&args[0]) else {
                    return;
                };
                if response.name == "echo" && matches!(response.body, ResponseBody::Data(_)) {
                    if let Some(bus) = weak.upgrade() {
                        request(&bus, "dup", "forever", Vec::new());
                    }
                }
            });
            bus.on("svc", handler);
        }
        let registration = provider().register(
            Actions::new()
                .with_future("echo", |_ctx, _args| async { Ok(Value::Null) })
                .with_stream("forever", |_ctx, _args| {
                    stream::pending::<Result<Value, RemoteError>>()
                }),
            &bus,
            RegisterOptions::new(),
        );

        request(&bus, "dup", "echo", Vec::new());
        settle().await;
        assert_eq!(registration.stats().active_invocations, 1);

        let cancel = CancelEnvelope {
            uid: Uid::from("dup"),
            name: "forever".into(),
            reason: CancelReason::Timeout,
        };
        bus.emit("svc", vec![cancel.into_value()]);
        assert_eq!(registration.stats().active_invocations, 0);
        assert!(seen.lock().iter().all(|(uid, _)| uid.as_str() == "dup"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deregister_removes_listener_and_aborts() {
        let bus = EventBus::shared();
        let recorder = Arc::new(RecordingLogger::default());
        let registration = provider().register(
            Actions::new().with_future("slow", |_ctx, _args| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Value::Null)
            }),
            &bus,
            RegisterOptions::new().with_logger(recorder.clone()),
        );
        assert_eq!(bus.listener_count("svc"), 1);

        request(&bus, "u1", "slow", Vec::new());
        request(&bus, "u2", "slow", Vec::new());
        settle().await;
        assert_eq!(registration.stats().active_invocations, 2);

        registration.deregister();
        registration.deregister();
        assert!(!registration.is_registered());
        assert_eq!(registration.stats().active_invocations, 0);
        assert_eq!(bus.listener_count("svc"), 0);
        assert!(recorder.contains(LogLevel::Info, "[pubsub-rpc] [provider] deregistered"));
    }

    #[tokio::test]
    async fn test_resolver_chooses_reply_emitter() {
        let inbound = EventBus::shared();
        let outbound = EventBus::shared();
        let seen = responses(&outbound);
        let reply_to: Arc<dyn EventEmitter> = outbound.clone();
        let resolver: OnEventResolver = Arc::new(move |args: &[Value]| {
            Ok(crate::transport::ResolvedEvent::with_emitter(
                args[1].clone(),
                reply_to.clone(),
            ))
        });
        let _registration = provider().register(
            Actions::new().with_future("ping", |ctx, _args| async move {
                Ok(ctx.raw_args[0].clone())
            }),
            &inbound,
            RegisterOptions::new().with_on_event_resolver(resolver),
        );

        let request = RequestEnvelope {
            uid: Uid::from("u1"),
            name: "ping".into(),
            args: Vec::new(),
            serialization: None,
        };
        inbound.emit("svc", vec![Value::from("sender-7"), request.into_value()]);
        settle().await;

        let seen = seen.lock();
        assert!(matches!(
            &seen[0].1,
            ResponseBody::Data(value) if value.as_str() == Some("sender-7")
        ));
    }
}

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

//! Request dispatch for one registration.
//!
//! The listener handler runs synchronously on whatever thread the transport
//! emits from. It parses the envelope, starts or aborts invocations, and
//! returns; each invocation then runs as its own task on the runtime the
//! provider registered from.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::envelope::{
    CancelEnvelope, Envelope, EnvelopeError, RequestEnvelope, ResponseBody, ResponseEnvelope, Uid,
};
use crate::error::RemoteError;
use crate::logging::SharedLogger;
use crate::provider::action::{ActionContext, Actions};
use crate::registry::Registry;
use crate::serialization::{Serialization, strategy_for};
use crate::transport::{EventEmitter, OnEventResolver};
use crate::value::Value;

type Results = BoxStream<'static, Result<Value, RemoteError>>;

/// Shared state of one registration.
pub(crate) struct Dispatch {
    pub(crate) channel: String,
    pub(crate) actions: Actions,
    pub(crate) emitter: Arc<dyn EventEmitter>,
    pub(crate) resolver: OnEventResolver,
    pub(crate) invocations: Mutex<HashMap<Uid, AbortHandle>>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) runtime: Handle,
    pub(crate) logger: SharedLogger,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "action panicked".to_owned()
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> RemoteError {
    RemoteError::with_name(RemoteError::ACTION_PANIC, panic_message(panic))
}

impl Dispatch {
    /// Handles one listener callback.
    pub(crate) fn handle(self: &Arc<Self>, raw_args: &[Value]) {
        let resolved = match (self.resolver)(raw_args) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.logger.warn(format_args!("ignoring event: {error}"));
                return;
            }
        };
        let emitter = resolved.emitter.unwrap_or_else(|| self.emitter.clone());

        match Envelope::from_value(&resolved.payload) {
            Ok(Envelope::Request(request)) => self.start(request, emitter, raw_args),
            Ok(Envelope::Cancel(cancel)) => self.cancel(&cancel),
            // Responses share the channel with requests.
            Ok(Envelope::Response(_)) => {}
            Err(EnvelopeError::UnsupportedSerialization { uid, name, tag }) => {
                self.logger.warn(format_args!(
                    "unsupported serialization \"{tag}\" requested, uid={uid}"
                ));
                let error = RemoteError::with_name(
                    RemoteError::SERIALIZATION,
                    format!("unsupported serialization \"{tag}\""),
                );
                self.reject(&*emitter, uid, name, error);
            }
            Err(error) => {
                self.logger
                    .warn(format_args!("ignoring malformed payload: {error}"));
            }
        }
    }

    fn reject(&self, emitter: &dyn EventEmitter, uid: Uid, name: String, error: RemoteError) {
        self.registry.invocation_metrics().record_rejected();
        emit(
            emitter,
            &self.channel,
            uid,
            name,
            ResponseBody::Error(error.to_value()),
        );
    }

    fn start(
        self: &Arc<Self>,
        request: RequestEnvelope,
        emitter: Arc<dyn EventEmitter>,
        raw_args: &[Value],
    ) {
        let RequestEnvelope {
            uid,
            name,
            args,
            serialization,
        } = request;

        let Some(action) = self.actions.get(&name) else {
            self.logger
                .warn(format_args!("unknown action \"{name}\" requested, uid={uid}"));
            let error = RemoteError::with_name(
                RemoteError::UNKNOWN_ACTION,
                format!("unknown action \"{name}\""),
            );
            self.reject(&*emitter, uid, name, error);
            return;
        };

        let ctx = ActionContext {
            uid: uid.clone(),
            name: name.clone(),
            channel: self.channel.clone(),
            raw_args: raw_args.to_vec(),
        };
        let results: Results = match catch_unwind(AssertUnwindSafe(|| action(ctx, args))) {
            Ok(result) => match result.into_stream() {
                Some(results) => results,
                None => {
                    let error = RemoteError::with_name(
                        RemoteError::UNSUPPORTED_RESULT,
                        format!("action \"{name}\" returned an unsupported result type"),
                    );
                    self.reject(&*emitter, uid, name, error);
                    return;
                }
            },
            Err(panic) => {
                let error = panic_error(&*panic);
                self.logger
                    .error(format_args!("action \"{name}\" panicked: {}", error.message));
                futures::stream::once(futures::future::ready(Err(error))).boxed()
            }
        };

        self.registry.invocation_metrics().record_started();
        // The task waits until its abort handle is in the map.
        let (gate, gated) = oneshot::channel();
        let task = self.runtime.spawn(self.clone().run(
            uid.clone(),
            name,
            results,
            serialization,
            emitter,
            gated,
        ));
        let active = {
            let mut invocations = self.invocations.lock();
            if let Some(previous) = invocations.insert(uid.clone(), task.abort_handle()) {
                previous.abort();
                self.logger
                    .warn(format_args!("uid={uid} reused, previous invocation aborted"));
            }
            invocations.len()
        };
        let _ = gate.send(());
        self.logger.debug(format_args!(
            "invocation added, uid={uid}, active invocations: {active}"
        ));
    }

    async fn run(
        self: Arc<Self>,
        uid: Uid,
        name: String,
        mut results: Results,
        serialization: Option<Serialization>,
        emitter: Arc<dyn EventEmitter>,
        gated: oneshot::Receiver<()>,
    ) {
        let _ = gated.await;
        let strategy = strategy_for(serialization);
        let metrics = self.registry.invocation_metrics();

        let terminal = loop {
            match AssertUnwindSafe(results.next()).catch_unwind().await {
                Ok(Some(Ok(value))) => match strategy.encode(value) {
                    Ok(data) => {
                        let body = ResponseBody::Data(data);
                        emit(&*emitter, &self.channel, uid.clone(), name.clone(), body);
                    }
                    Err(error) => {
                        self.logger.error(format_args!(
                            "failed to encode {} response of \"{name}\", uid={uid}: {error}",
                            strategy.name()
                        ));
                        metrics.record_failed();
                        let error =
                            RemoteError::with_name(RemoteError::SERIALIZATION, error.message());
                        break ResponseBody::Error(error.to_value());
                    }
                },
                Ok(Some(Err(error))) => {
                    self.logger
                        .error(format_args!("action \"{name}\" failed, uid={uid}: {error}"));
                    metrics.record_failed();
                    break ResponseBody::Error(error.to_value());
                }
                Ok(None) => {
                    metrics.record_completed();
                    break ResponseBody::Complete;
                }
                Err(panic) => {
                    let error = panic_error(&*panic);
                    self.logger.error(format_args!(
                        "action \"{name}\" panicked, uid={uid}: {}",
                        error.message
                    ));
                    metrics.record_failed();
                    break ResponseBody::Error(error.to_value());
                }
            }
        };

        // A reused uid may already map to the task that replaced this one.
        let own = tokio::task::id();
        let active = {
            let mut invocations = self.invocations.lock();
            if invocations.get(&uid).is_some_and(|task| task.id() == own) {
                invocations.remove(&uid);
            }
            invocations.len()
        };
        self.logger.debug(format_args!(
            "invocation removed, uid={uid}, active invocations: {active}"
        ));
        emit(&*emitter, &self.channel, uid, name, terminal);
    }

    fn cancel(&self, cancel: &CancelEnvelope) {
        let removed = self.invocations.lock().remove(&cancel.uid);
        match removed {
            Some(task) => {
                task.abort();
                self.registry.invocation_metrics().record_cancelled();
                self.logger.debug(format_args!(
                    "invocation cancelled by client, uid={}, reason=\"{}\"",
                    cancel.uid, cancel.reason
                ));
            }
            None => self.logger.debug(format_args!(
                "no invocation to cancel, uid={}",
                cancel.uid
            )),
        }
    }

    /// Aborts every active invocation and returns how many there were.
    pub(crate) fn abort_all(&self) -> usize {
        let drained: Vec<AbortHandle> =
            self.invocations.lock().drain().map(|(_, task)| task).collect();
        for task in &drained {
            task.abort();
            self.registry.invocation_metrics().record_cancelled();
        }
        drained.len()
    }

    pub(crate) fn active_invocations(&self) -> usize {
        self.invocations.lock().len()
    }
}

fn emit(emitter: &dyn EventEmitter, channel: &str, uid: Uid, name: String, body: ResponseBody) {
    let response = ResponseEnvelope { uid, name, body };
    emitter.emit(channel, vec![response.into_value()]);
}

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

//! The per-call driver task.
//!
//! Each call runs as one task that owns everything transient about it: the
//! multiplexer handle, the timer and the finish signal. The task races
//!
//! 1. inbound events carrying responses for its uid,
//! 2. the timer (armed until the first response arrives),
//! 3. the caller's finish signal,
//! 4. the caller going away,
//!
//! and tears the call down exactly once when the first of them ends it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::api::OutputMode;
use crate::client::options::{FinishSignal, NotificationWrapper};
use crate::client::reply::Observer;
use crate::envelope::{
    CancelEnvelope, CancelReason, Envelope, RequestEnvelope, ResponseBody, ResponseEnvelope, Uid,
};
use crate::error::{CallError, RemoteError};
use crate::logging::{Logger, SharedLogger};
use crate::registry::Registry;
use crate::serialization::{Serialization, strategy_for};
use crate::transport::{EmittersSource, EventEmitter, OnEventResolver, TransportError};
use crate::value::Value;

/// Shortest timer a call runs with; a zero timeout still yields once.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Everything needed to start one call, resolved from options and config.
pub(crate) struct PendingCall {
    pub(crate) name: String,
    pub(crate) args: Vec<Value>,
    pub(crate) channel: String,
    pub(crate) listen_channel: String,
    pub(crate) timeout: Duration,
    pub(crate) finish_signal: Option<FinishSignal>,
    pub(crate) serialization: Option<Serialization>,
    pub(crate) wrapper: Option<NotificationWrapper>,
    pub(crate) resolver: OnEventResolver,
    pub(crate) logger: SharedLogger,
    pub(crate) source: EmittersSource,
    pub(crate) registry: Arc<Registry>,
}

/// Where a call delivers its results.
pub(crate) enum Sink {
    /// A future or stream reply reading the other end.
    Channel(mpsc::UnboundedSender<Result<Value, CallError>>),
    /// A subscription observer.
    Observer(Box<dyn Observer>),
}

impl Sink {
    fn next(&mut self, value: Value) {
        match self {
            Self::Channel(tx) => {
                let _ = tx.send(Ok(value));
            }
            Self::Observer(observer) => observer.next(value),
        }
    }

    fn error(&mut self, error: CallError) {
        match self {
            Self::Channel(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::Observer(observer) => observer.error(error),
        }
    }

    fn complete(&mut self) {
        // Channel replies see completion as the sender dropping.
        if let Self::Observer(observer) = self {
            observer.complete();
        }
    }
}

/// How the call ended, as far as the caller is told.
enum Terminal {
    Complete,
    Error(CallError),
    /// The caller is gone; nobody to tell.
    Silent,
}

fn notify(wrapper: &Option<NotificationWrapper>, mut deliver: impl FnMut()) {
    match wrapper {
        Some(wrapper) => wrapper(&mut deliver),
        None => deliver(),
    }
}

fn deliver(wrapper: &Option<NotificationWrapper>, sink: &mut Sink, value: Value) {
    let mut value = Some(value);
    notify(wrapper, || {
        if let Some(value) = value.take() {
            sink.next(value);
        }
    });
}

fn conclude(wrapper: &Option<NotificationWrapper>, sink: Sink, terminal: Terminal) {
    let mut parts = Some((sink, terminal));
    notify(wrapper, || {
        if let Some((mut sink, terminal)) = parts.take() {
            match terminal {
                Terminal::Complete => sink.complete(),
                Terminal::Error(error) => sink.error(error),
                Terminal::Silent => {}
            }
        }
    });
}

fn match_response(
    resolver: &OnEventResolver,
    args: &[Value],
    uid: &Uid,
    logger: &dyn Logger,
) -> Option<ResponseEnvelope> {
    let payload = match resolver(args) {
        Ok(resolved) => resolved.payload,
        Err(error) => {
            logger.warn(format_args!("ignoring event: {error}"));
            return None;
        }
    };
    match Envelope::from_value(&payload) {
        Ok(Envelope::Response(response)) if response.uid == *uid => Some(response),
        Ok(_) => None,
        Err(error) => {
            logger.warn(format_args!("ignoring malformed payload: {error}"));
            None
        }
    }
}

fn emit_cancel(
    emitter: &dyn EventEmitter,
    channel: &str,
    uid: &Uid,
    name: &str,
    reason: CancelReason,
    logger: &dyn Logger,
) {
    let envelope = CancelEnvelope {
        uid: uid.clone(),
        name: name.to_owned(),
        reason,
    };
    logger.debug(format_args!(
        "\"unsubscribe-request\" signal sent to provider, source: \"{}\", uid={uid}",
        envelope.reason
    ));
    emitter.emit(channel, vec![envelope.into_value()]);
}

impl PendingCall {
    /// Starts the driver task. Must run inside a Tokio runtime.
    ///
    /// `stopped` resolves when the caller is no longer interested.
    pub(crate) fn spawn(self, mode: OutputMode, sink: Sink, stopped: BoxFuture<'static, ()>) {
        tokio::spawn(self.drive(mode, sink, stopped));
    }

    async fn drive(self, mode: OutputMode, mut sink: Sink, mut stopped: BoxFuture<'static, ()>) {
        let Self {
            name,
            args,
            channel,
            listen_channel,
            timeout,
            finish_signal,
            serialization,
            wrapper,
            resolver,
            logger,
            source,
            registry,
        } = self;

        let emitters = match source.resolve() {
            Ok(emitters) => emitters,
            Err(error) => {
                logger.error(format_args!(
                    "failed to resolve transport for \"{name}\": {error}"
                ));
                conclude(&wrapper, sink, Terminal::Error(error.into()));
                return;
            }
        };

        let uid = Uid::new();
        let mut handle = registry
            .multiplexer()
            .acquire(&emitters.listener, &listen_channel);
        let mut events = handle.subscribe(uid.clone());
        let strategy = strategy_for(serialization);
        let metrics = registry.call_metrics();

        let sleep = tokio::time::sleep(timeout.max(MIN_TIMEOUT));
        tokio::pin!(sleep);
        let finish = async move {
            match finish_signal {
                Some(signal) => signal.settled().await,
                None => futures::future::pending().await,
            }
        };
        tokio::pin!(finish);

        let request = RequestEnvelope {
            uid: uid.clone(),
            name: name.clone(),
            args,
            serialization,
        };
        let started = Instant::now();
        emitters.emitter.emit(&channel, vec![request.into_value()]);
        metrics.record_call_started();
        logger.debug(format_args!(
            "request emitted, uid={uid}, name=\"{name}\", channel=\"{channel}\""
        ));

        let mut armed = true;
        let mut delivered = false;
        let terminal = loop {
            tokio::select! {
                biased;

                () = &mut stopped => {
                    metrics.record_call_cancelled();
                    logger.debug(format_args!("caller dropped the reply, uid={uid}"));
                    break Terminal::Silent;
                }

                event = events.recv() => {
                    let Some(args) = event else {
                        metrics.record_call_failed();
                        break Terminal::Error(TransportError::Closed.into());
                    };
                    let Some(response) = match_response(&resolver, &args, &uid, &*logger) else {
                        continue;
                    };
                    armed = false;
                    match response.body {
                        ResponseBody::Data(data) => match strategy.decode(data) {
                            Ok(value) => {
                                deliver(&wrapper, &mut sink, value);
                                delivered = true;
                                if mode == OutputMode::Single {
                                    metrics.record_call_completed(started.elapsed());
                                    break Terminal::Complete;
                                }
                            }
                            Err(source) => {
                                logger.error(format_args!(
                                    "failed to decode {} response, uid={uid}: {source}",
                                    strategy.name()
                                ));
                                metrics.record_call_failed();
                                break Terminal::Error(CallError::Decode {
                                    action: name.clone(),
                                    source,
                                });
                            }
                        },
                        ResponseBody::Complete => {
                            if mode == OutputMode::Single && !delivered {
                                // An action producing no value answers "void".
                                deliver(&wrapper, &mut sink, Value::Null);
                            }
                            metrics.record_call_completed(started.elapsed());
                            break Terminal::Complete;
                        }
                        ResponseBody::Error(error) => {
                            metrics.record_call_failed();
                            let remote = RemoteError::from_value(&error);
                            break Terminal::Error(CallError::from_remote(&name, remote));
                        }
                    }
                }

                settled = &mut finish => {
                    emit_cancel(
                        &*emitters.emitter,
                        &channel,
                        &uid,
                        &name,
                        CancelReason::FinishSignal,
                        &*logger,
                    );
                    metrics.record_call_cancelled();
                    break match settled {
                        Ok(()) if mode == OutputMode::Stream || delivered => Terminal::Complete,
                        Ok(()) => Terminal::Error(CallError::AbortedByFinishSignal {
                            action: name.clone(),
                            reason: None,
                        }),
                        Err(reason) => Terminal::Error(CallError::AbortedByFinishSignal {
                            action: name.clone(),
                            reason: Some(reason),
                        }),
                    };
                }

                () = &mut sleep, if armed => {
                    emit_cancel(
                        &*emitters.emitter,
                        &channel,
                        &uid,
                        &name,
                        CancelReason::Timeout,
                        &*logger,
                    );
                    metrics.record_call_timed_out();
                    break Terminal::Error(CallError::Timeout {
                        action: name.clone(),
                        channel: channel.clone(),
                        timeout,
                    });
                }
            }
        };

        handle.release();
        conclude(&wrapper, sink, terminal);
    }
}

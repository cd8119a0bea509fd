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

//! Reply shapes handed to callers.
//!
//! All replies are lazy: the request is emitted when a [`SingleReply`] or
//! [`StreamReply`] is first polled, or when a [`SubscriptionReply`] is
//! subscribed. Dropping a reply before then sends nothing; dropping it
//! afterwards tears the call down without notifying the provider.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::FutureExt;
use futures::future::FusedFuture;
use futures::stream::{FusedStream, Stream};
use tokio::sync::{mpsc, oneshot};

use crate::api::OutputMode;
use crate::client::driver::{PendingCall, Sink};
use crate::error::CallError;
use crate::transport::TransportError;
use crate::value::Value;

/// Receives the results of a subscription call.
///
/// Exactly one of [`error`](Observer::error) and
/// [`complete`](Observer::complete) ends a call that is not unsubscribed
/// first. Callbacks run on the call's driver task.
pub trait Observer: Send + 'static {
    /// Receives one value.
    fn next(&mut self, value: Value);

    /// Receives the error that ended the call.
    fn error(&mut self, error: CallError);

    /// Signals that the call ended normally.
    fn complete(&mut self);
}

type Deliveries = mpsc::UnboundedReceiver<Result<Value, CallError>>;

enum Lazy {
    Idle(Box<PendingCall>),
    Running(Deliveries),
    Done,
}

impl Lazy {
    fn poll_next(
        &mut self,
        mode: OutputMode,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Value, CallError>>> {
        if let Self::Idle(_) = self {
            if let Self::Idle(call) = std::mem::replace(self, Self::Done) {
                *self = Self::Running(start(*call, mode));
            }
        }
        match self {
            Self::Running(rx) => {
                let item = ready!(rx.poll_recv(cx));
                if item.is_none() {
                    *self = Self::Done;
                }
                Poll::Ready(item)
            }
            Self::Idle(_) | Self::Done => Poll::Ready(None),
        }
    }

    const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

fn start(call: PendingCall, mode: OutputMode) -> Deliveries {
    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = tx.clone();
    let stopped = async move { watcher.closed().await }.boxed();
    call.spawn(mode, Sink::Channel(tx), stopped);
    rx
}

/// Reply of a [`OutputMode::Single`] call: a future of its first value.
///
/// Must be polled inside a Tokio runtime.
pub struct SingleReply {
    state: Lazy,
}

impl SingleReply {
    pub(crate) fn new(call: PendingCall) -> Self {
        Self {
            state: Lazy::Idle(Box::new(call)),
        }
    }
}

impl Future for SingleReply {
    type Output = Result<Value, CallError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let item = ready!(this.state.poll_next(OutputMode::Single, cx));
        this.state = Lazy::Done;
        Poll::Ready(item.unwrap_or_else(|| Err(TransportError::Closed.into())))
    }
}

impl FusedFuture for SingleReply {
    fn is_terminated(&self) -> bool {
        self.state.is_done()
    }
}

impl fmt::Debug for SingleReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleReply")
            .field("started", &!matches!(self.state, Lazy::Idle(_)))
            .finish()
    }
}

/// Reply of a [`OutputMode::Stream`] call: a stream of its values.
///
/// The stream ends after `complete`, after an error item, or when the finish
/// signal resolves. Must be polled inside a Tokio runtime.
pub struct StreamReply {
    state: Lazy,
}

impl StreamReply {
    pub(crate) fn new(call: PendingCall) -> Self {
        Self {
            state: Lazy::Idle(Box::new(call)),
        }
    }
}

impl Stream for StreamReply {
    type Item = Result<Value, CallError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().state.poll_next(OutputMode::Stream, cx)
    }
}

impl FusedStream for StreamReply {
    fn is_terminated(&self) -> bool {
        self.state.is_done()
    }
}

impl fmt::Debug for StreamReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReply")
            .field("started", &!matches!(self.state, Lazy::Idle(_)))
            .field("terminated", &self.state.is_done())
            .finish()
    }
}

/// Reply of a [`OutputMode::Subscription`] call.
pub struct SubscriptionReply {
    call: Box<PendingCall>,
}

impl SubscriptionReply {
    pub(crate) fn new(call: PendingCall) -> Self {
        Self {
            call: Box::new(call),
        }
    }

    /// Starts the call, pushing its results to `observer`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn subscribe<O: Observer>(self, observer: O) -> Subscription {
        let (stop, stop_rx) = oneshot::channel::<()>();
        // A dropped `Subscription` keeps the call running.
        let stopped = async move {
            if stop_rx.await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
        .boxed();
        self.call
            .spawn(OutputMode::Subscription, Sink::Observer(Box::new(observer)), stopped);
        Subscription { stop: Some(stop) }
    }
}

impl fmt::Debug for SubscriptionReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionReply")
            .field("action", &self.call.name)
            .finish()
    }
}

/// A running subscription call.
#[derive(Debug)]
pub struct Subscription {
    stop: Option<oneshot::Sender<()>>,
}

impl Subscription {
    /// Stops the call. No further callbacks run once the driver sees it.
    ///
    /// The provider is not notified, the same as dropping a stream reply.
    pub fn unsubscribe(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Returns `true` once the call ended, for any reason.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.stop.as_ref().is_none_or(oneshot::Sender::is_closed)
    }
}

/// The reply of a call, shaped by the action's [`OutputMode`].
#[derive(Debug)]
pub enum Reply {
    /// A future of one value.
    Single(SingleReply),
    /// A stream of values.
    Stream(StreamReply),
    /// An observer-driven subscription.
    Subscription(SubscriptionReply),
}

impl Reply {
    /// Returns the output mode this reply was shaped by.
    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        match self {
            Self::Single(_) => OutputMode::Single,
            Self::Stream(_) => OutputMode::Stream,
            Self::Subscription(_) => OutputMode::Subscription,
        }
    }

    /// Returns the future, if the action is single-valued.
    #[must_use]
    pub fn into_single(self) -> Option<SingleReply> {
        match self {
            Self::Single(reply) => Some(reply),
            _ => None,
        }
    }

    /// Returns the stream, if the action streams.
    #[must_use]
    pub fn into_stream(self) -> Option<StreamReply> {
        match self {
            Self::Stream(reply) => Some(reply),
            _ => None,
        }
    }

    /// Returns the subscription starter, if the action is a subscription.
    #[must_use]
    pub fn into_subscription(self) -> Option<SubscriptionReply> {
        match self {
            Self::Subscription(reply) => Some(reply),
            _ => None,
        }
    }
}

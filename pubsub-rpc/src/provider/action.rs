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

//! Actions and what they return.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::{FutureExt, StreamExt};

use crate::envelope::Uid;
use crate::error::RemoteError;
use crate::value::Value;

/// Details of the request an action is answering.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Correlation id of the request.
    pub uid: Uid,
    /// Action name the request named.
    pub name: String,
    /// Channel the request arrived on.
    pub channel: String,
    /// Arguments the transport passed to the listener, before resolution.
    ///
    /// Bridges that pass sender details alongside the envelope expose them
    /// here.
    pub raw_args: Vec<Value>,
}

/// What an action hands back to the provider.
///
/// # Examples
///
/// ```rust
/// use futures::stream;
/// use pubsub_rpc::provider::ActionResult;
/// use pubsub_rpc::Value;
///
/// let one = ActionResult::future(async { Ok(Value::from("done")) });
/// let many = ActionResult::stream(stream::iter((1..=3).map(|n| Ok(Value::from(n)))));
/// # drop((one, many));
/// ```
pub enum ActionResult {
    /// A single value (or failure), answered as one `data` and `complete`.
    Future(BoxFuture<'static, Result<Value, RemoteError>>),
    /// Values answered one `data` each, then `complete`. The first error
    /// ends the invocation.
    Stream(BoxStream<'static, Result<Value, RemoteError>>),
    /// Anything else. Answered with an `UnsupportedActionResultType` error.
    Unsupported,
}

impl ActionResult {
    /// Wraps a future.
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        Self::Future(future.boxed())
    }

    /// Wraps a stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Value, RemoteError>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// Answers immediately.
    #[must_use]
    pub fn ready(result: Result<Value, RemoteError>) -> Self {
        Self::Future(futures::future::ready(result).boxed())
    }

    pub(crate) fn into_stream(self) -> Option<BoxStream<'static, Result<Value, RemoteError>>> {
        match self {
            Self::Future(future) => Some(future.into_stream().boxed()),
            Self::Stream(stream) => Some(stream),
            Self::Unsupported => None,
        }
    }
}

impl fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Future(_) => "Future(..)",
            Self::Stream(_) => "Stream(..)",
            Self::Unsupported => "Unsupported",
        })
    }
}

/// An action implementation.
pub type Action = Arc<dyn Fn(ActionContext, Vec<Value>) -> ActionResult + Send + Sync>;

/// The actions a provider answers, by name.
///
/// # Examples
///
/// ```rust
/// use futures::stream;
/// use pubsub_rpc::provider::Actions;
/// use pubsub_rpc::{RemoteError, Value};
///
/// let actions = Actions::new()
///     .with_future("echo", |_ctx, args| async move {
///         args.into_iter().next().ok_or_else(|| RemoteError::new("nothing to echo"))
///     })
///     .with_stream("count", |_ctx, _args| {
///         stream::iter((1..=3).map(|n| Ok(Value::from(n))))
///     });
///
/// assert!(actions.contains("echo"));
/// assert_eq!(actions.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Actions {
    map: BTreeMap<String, Action>,
}

impl Actions {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action returning any [`ActionResult`].
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext, Vec<Value>) -> ActionResult + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(action));
        self
    }

    /// Adds an action answering with one value.
    #[must_use]
    pub fn with_future<F, Fut>(self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RemoteError>> + Send + 'static,
    {
        self.with(name, move |ctx, args| ActionResult::future(action(ctx, args)))
    }

    /// Adds an action answering with a stream of values.
    #[must_use]
    pub fn with_stream<F, S>(self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionContext, Vec<Value>) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Value, RemoteError>> + Send + 'static,
    {
        self.with(name, move |ctx, args| ActionResult::stream(action(ctx, args)))
    }

    /// Adds or replaces an action.
    pub fn insert(&mut self, name: impl Into<String>, action: Action) {
        self.map.insert(name.into(), action);
    }

    /// Looks an action up.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Action> {
        self.map.get(name)
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Returns the action names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(String::as_str)
    }

    /// Returns the number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if there are no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn ctx() -> ActionContext {
        ActionContext {
            uid: Uid::from("u1"),
            name: "act".into(),
            channel: "svc".into(),
            raw_args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_future_result_becomes_single_item_stream() {
        let actions = Actions::new().with_future("act", |_ctx, _args| async { Ok(Value::from(7)) });
        let action = actions.get("act").unwrap();
        let items: Vec<_> = action(ctx(), Vec::new()).into_stream().unwrap().collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().as_i64(), Some(7));
    }

    #[tokio::test]
    async fn test_stream_result_keeps_order() {
        let actions = Actions::new().with_stream("act", |_ctx, _args| {
            stream::iter(vec![Ok(Value::from(1)), Ok(Value::from(2))])
        });
        let action = actions.get("act").unwrap();
        let items: Vec<i64> = action(ctx(), Vec::new())
            .into_stream()
            .unwrap()
            .map(|item| item.unwrap().as_i64().unwrap())
            .collect()
            .await;
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn test_unsupported_has_no_stream() {
        assert!(ActionResult::Unsupported.into_stream().is_none());
    }

    #[test]
    fn test_actions_receive_context() {
        let actions = Actions::new().with("act", |ctx, args| {
            assert_eq!(ctx.uid.as_str(), "u1");
            assert!(args.is_empty());
            ActionResult::Unsupported
        });
        let action = actions.get("act").unwrap();
        assert!(matches!(action(ctx(), Vec::new()), ActionResult::Unsupported));
        assert_eq!(actions.names().collect::<Vec<_>>(), vec!["act"]);
    }
}

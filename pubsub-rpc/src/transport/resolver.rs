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

//! Adapters for transports that wrap the envelope in their callbacks.

use std::fmt;
use std::sync::Arc;

use crate::Value;
use crate::transport::{EventEmitter, TransportError};

/// Position of the envelope in listener callback arguments by default.
pub const DEFAULT_PAYLOAD_ARG_INDEX: usize = 0;

/// What an [`OnEventResolver`] extracts from one listener callback.
#[derive(Clone)]
pub struct ResolvedEvent {
    /// The envelope.
    pub payload: Value,
    /// Emitter to answer on. `None` means the one the provider registered
    /// with. Clients ignore this field.
    pub emitter: Option<Arc<dyn EventEmitter>>,
}

impl ResolvedEvent {
    /// Creates a resolved event answering on the registered emitter.
    #[must_use]
    pub const fn payload(payload: Value) -> Self {
        Self {
            payload,
            emitter: None,
        }
    }

    /// Creates a resolved event answering on `emitter`.
    #[must_use]
    pub fn with_emitter(payload: Value, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            payload,
            emitter: Some(emitter),
        }
    }
}

impl fmt::Debug for ResolvedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEvent")
            .field("payload", &self.payload)
            .field("emitter", &self.emitter.is_some())
            .finish()
    }
}

/// Extracts the envelope (and optionally a reply emitter) from the raw
/// arguments a transport passed to a listener.
///
/// Bridges like Electron's IPC pass an event object first and the payload
/// second; a resolver adapts them without touching the transport.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::transport::{OnEventResolver, ResolvedEvent, TransportError};
/// use pubsub_rpc::Value;
///
/// let second_arg: OnEventResolver = Arc::new(|args: &[Value]| {
///     args.get(1)
///         .cloned()
///         .map(ResolvedEvent::payload)
///         .ok_or_else(|| TransportError::resolution("expected two arguments"))
/// });
/// ```
pub type OnEventResolver =
    Arc<dyn Fn(&[Value]) -> Result<ResolvedEvent, TransportError> + Send + Sync>;

/// Returns the resolver that takes the envelope from the first argument.
#[must_use]
pub fn default_resolver() -> OnEventResolver {
    Arc::new(|args: &[Value]| {
        args.get(DEFAULT_PAYLOAD_ARG_INDEX)
            .cloned()
            .map(ResolvedEvent::payload)
            .ok_or_else(|| TransportError::resolution("listener received no arguments"))
    })
}

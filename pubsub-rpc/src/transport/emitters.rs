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

//! Emitter/listener pairs and their lazy resolution.

use std::fmt;
use std::sync::Arc;

use crate::transport::{EventBus, EventEmitter, EventListener, TransportError};

/// The two halves of one transport, as a client or provider uses them.
///
/// Emitter and listener may be the same object (an [`EventBus`]) or two ends
/// of a bridge.
#[derive(Clone)]
pub struct Emitters {
    /// Publishing half.
    pub emitter: Arc<dyn EventEmitter>,
    /// Subscribing half.
    pub listener: Arc<dyn EventListener>,
}

impl Emitters {
    /// Pairs an emitter with a listener.
    #[must_use]
    pub fn new(emitter: Arc<dyn EventEmitter>, listener: Arc<dyn EventListener>) -> Self {
        Self { emitter, listener }
    }

    /// Uses one bus for both halves.
    #[must_use]
    pub fn from_bus(bus: &Arc<EventBus>) -> Self {
        Self {
            emitter: bus.clone(),
            listener: bus.clone(),
        }
    }
}

impl fmt::Debug for Emitters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitters")
            .field("emitter", &Arc::as_ptr(&self.emitter).cast::<()>())
            .field("listener", &Arc::as_ptr(&self.listener).cast::<()>())
            .finish()
    }
}

/// Function producing [`Emitters`] at call time.
pub type EmittersResolver = Arc<dyn Fn() -> Result<Emitters, TransportError> + Send + Sync>;

/// Where a call finds its transport: a fixed pair, or a resolver invoked once
/// per call.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::transport::{Emitters, EmittersSource, EventBus};
///
/// let bus = EventBus::shared();
/// let fixed = EmittersSource::from(Emitters::from_bus(&bus));
/// let lazy = EmittersSource::resolver(move || Ok(Emitters::from_bus(&bus)));
///
/// assert!(fixed.resolve().is_ok());
/// assert!(lazy.resolve().is_ok());
/// ```
#[derive(Clone)]
pub enum EmittersSource {
    /// Always the same pair.
    Fixed(Emitters),
    /// Resolved on every call.
    Resolver(EmittersResolver),
}

impl EmittersSource {
    /// Wraps a resolver function.
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn() -> Result<Emitters, TransportError> + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(resolve))
    }

    /// Returns the pair to use for one call.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's [`TransportError`].
    pub fn resolve(&self) -> Result<Emitters, TransportError> {
        match self {
            Self::Fixed(emitters) => Ok(emitters.clone()),
            Self::Resolver(resolve) => resolve(),
        }
    }
}

impl From<&Arc<EventBus>> for Emitters {
    fn from(bus: &Arc<EventBus>) -> Self {
        Self::from_bus(bus)
    }
}

impl From<Emitters> for EmittersSource {
    fn from(emitters: Emitters) -> Self {
        Self::Fixed(emitters)
    }
}

impl From<&Arc<EventBus>> for EmittersSource {
    fn from(bus: &Arc<EventBus>) -> Self {
        Self::Fixed(Emitters::from_bus(bus))
    }
}

impl fmt::Debug for EmittersSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(emitters) => f.debug_tuple("Fixed").field(emitters).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

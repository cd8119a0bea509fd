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

//! Transport boundary.
//!
//! The engines never talk to a network themselves. They consume any
//! publish/subscribe channel through two small traits:
//!
//! - [`EventListener`]: subscribe and unsubscribe a handler on a named event
//! - [`EventEmitter`]: publish arguments on a named event
//!
//! Handlers are [`EventHandler`]s compared by pointer identity. [`Emitters`]
//! pairs the two halves, [`EmittersSource`] defers choosing them until call
//! time, and an [`OnEventResolver`] adapts bridges that do not pass the
//! envelope as the first callback argument.
//!
//! [`EventBus`] is an in-process implementation of both traits, used by the
//! tests and for embedding.

mod bus;
mod emitters;
mod error;
mod resolver;
mod traits;

pub use self::bus::EventBus;
pub use self::emitters::{Emitters, EmittersResolver, EmittersSource};
pub use self::error::TransportError;
pub use self::resolver::{
    DEFAULT_PAYLOAD_ARG_INDEX, OnEventResolver, ResolvedEvent, default_resolver,
};
pub use self::traits::{EventEmitter, EventHandler, EventListener, same_handler};

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

//! # pubsub-rpc
//!
//! Request/response and streaming calls over any publish/subscribe event
//! channel.
//!
//! A transport here is anything that can `emit(event, args)` and
//! `on(event, handler)`: an in-process bus, a window `postMessage` bridge, an
//! Electron-style IPC pair, a Redis pub/sub adapter. This crate adds
//! correlation, timeouts, cancellation and streaming on top, with the calls
//! travelling as plain envelopes:
//!
//! ```text
//! client                                   provider
//!   | -- {type:"request", uid, name, args} --> |
//!   | <-- {type:"response", uid, data} ------- |   (zero or more)
//!   | <-- {type:"response", uid, complete} --- |   or {.., error}
//!   | -- {type:"unsubscribe-request", uid} --> |   (timeout / finish signal)
//! ```
//!
//! ## Layout
//!
//! - [`value`]: the dynamic [`Value`] carried by envelopes
//! - [`envelope`]: request, cancel and response envelopes
//! - [`serialization`]: payload strategies (`json-refs`, `msgpack`)
//! - [`transport`]: the emitter/listener traits and [`EventBus`](transport::EventBus)
//! - [`client`]: calls and their replies
//! - [`provider`]: action registration and dispatch
//! - [`registry`]: the listener multiplexer and call metrics
//! - [`service`]: the [`Service`] facade tying it together
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use pubsub_rpc::client::CallOptions;
//! use pubsub_rpc::provider::{Actions, RegisterOptions};
//! use pubsub_rpc::transport::EventBus;
//! use pubsub_rpc::{ApiDefinition, Service, ServiceConfig, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = EventBus::shared();
//! let api = ApiDefinition::new().stream("countdown");
//! let service = Service::new(ServiceConfig::new("timer"), api)?;
//!
//! let _registration = service.register(
//!     Actions::new().with_stream("countdown", |_ctx, args| {
//!         let from = args.first().and_then(Value::as_i64).unwrap_or(3);
//!         futures::stream::iter((0..=from).rev().map(|n| Ok(Value::from(n))))
//!     }),
//!     &bus,
//!     RegisterOptions::new(),
//! );
//!
//! let values: Vec<_> = service
//!     .call("countdown", CallOptions::new(), &bus)
//!     .invoke(vec![Value::from(2)])
//!     .into_stream()
//!     .expect("declared stream")
//!     .map(|item| item.map(|value| value.as_i64()))
//!     .collect()
//!     .await;
//! assert_eq!(values.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `observability` (default): [`TracingLogger`](logging::TracingLogger)
//!   and `metrics` counters for calls and invocations.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod provider;
pub mod registry;
pub mod serialization;
pub mod service;
pub mod transport;
pub mod value;

pub use api::{ActionDescriptor, ApiDefinition, OutputMode};
pub use client::{CallOptions, Reply};
pub use config::{ConfigError, ServiceConfig};
pub use error::{CallError, RemoteError, ServiceError};
pub use logging::{LogLevel, Logger, SharedLogger};
pub use provider::{ActionContext, ActionResult, Actions};
pub use registry::Registry;
pub use serialization::Serialization;
pub use service::Service;
pub use transport::{EventEmitter, EventListener, TransportError};
pub use value::Value;

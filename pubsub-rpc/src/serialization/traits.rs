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

//! Serialization strategy trait definition.
//!
//! This module defines the core [`Strategy`] trait that every payload
//! encoding implements.

use crate::Value;
use crate::serialization::{DeserializationError, SerializationError};

/// Pluggable encoding of response payload data.
///
/// A strategy is a pair of functions: [`encode`](Strategy::encode) runs on the
/// provider for every emitted value and [`decode`](Strategy::decode) runs on
/// the client for every received `data` envelope. The strategy is selected per
/// call, so one provider serves callers using different strategies at the
/// same time.
///
/// # Thread Safety
///
/// All strategies must be `Send + Sync + 'static`; the built-in ones are
/// stateless or hold only configuration.
///
/// # Examples
///
/// ## Using a strategy
///
/// ```rust
/// use pubsub_rpc::serialization::{MessagePack, Strategy};
/// use pubsub_rpc::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let strategy = MessagePack::new();
/// let value = Value::from(serde_json::json!({"id": 42, "text": "Hello"}));
///
/// let wire = strategy.encode(value.clone())?;
/// assert!(wire.as_bytes().is_some());
///
/// let decoded = strategy.decode(wire)?;
/// assert_eq!(value, decoded);
/// # Ok(())
/// # }
/// ```
///
/// ## Implementing a custom strategy
///
/// ```rust
/// use pubsub_rpc::serialization::{DeserializationError, SerializationError, Strategy};
/// use pubsub_rpc::Value;
///
/// struct JsonText;
///
/// impl Strategy for JsonText {
///     fn encode(&self, value: Value) -> Result<Value, SerializationError> {
///         Ok(Value::String(serde_json::to_string(&value)?))
///     }
///
///     fn decode(&self, wire: Value) -> Result<Value, DeserializationError> {
///         let text = wire
///             .as_str()
///             .ok_or_else(|| DeserializationError::new("expected a JSON string"))?;
///         Ok(serde_json::from_str(text)?)
///     }
///
///     fn name(&self) -> &'static str {
///         "json-text"
///     }
/// }
/// ```
pub trait Strategy: Send + Sync + 'static {
    /// Encodes a value emitted by an action into its wire representation.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the value has no representation in
    /// this format.
    fn encode(&self, value: Value) -> Result<Value, SerializationError>;

    /// Decodes a wire representation back into a value.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the wire value was not produced by
    /// this strategy or is corrupted.
    fn decode(&self, wire: Value) -> Result<Value, DeserializationError>;

    /// Returns the name of this strategy, used in logs.
    fn name(&self) -> &'static str;
}

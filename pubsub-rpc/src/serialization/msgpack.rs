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

//! MessagePack strategy implementation.
//!
//! This module provides a binary strategy based on MessagePack via
//! `rmp-serde`. The wire form is a [`Value::Bytes`] node, so transports that
//! carry binary payloads can forward it without a second encoding step.

use crate::Value;
use crate::serialization::{DeserializationError, SerializationError, Strategy};

/// MessagePack strategy.
///
/// `MessagePack` trades reference preservation for a compact binary
/// representation. Shared nodes are duplicated on the wire, so the receiver
/// gets a tree of distinct nodes.
///
/// # Examples
///
/// ## Basic usage
///
/// ```rust
/// use pubsub_rpc::serialization::{MessagePack, Strategy};
/// use pubsub_rpc::Value;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let strategy = MessagePack::default();
/// let value = Value::from(serde_json::json!({"id": 42, "values": [1, 2, 3]}));
///
/// let wire = strategy.encode(value.clone())?;
/// assert_eq!(strategy.decode(wire)?, value);
/// # Ok(())
/// # }
/// ```
///
/// ## With maximum size limit
///
/// ```rust
/// use pubsub_rpc::serialization::MessagePack;
///
/// // Refuse to decode anything above 1MB
/// let strategy = MessagePack::new().with_max_size(1024 * 1024);
/// ```
#[derive(Clone, Debug)]
pub struct MessagePack {
    max_size: Option<usize>,
}

impl MessagePack {
    /// Creates a new MessagePack strategy with no size limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_size: None }
    }

    /// Sets a maximum encoded size accepted by [`decode`](Strategy::decode).
    #[must_use]
    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Removes any size limit.
    #[must_use]
    pub const fn with_no_limit(mut self) -> Self {
        self.max_size = None;
        self
    }
}

impl Default for MessagePack {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MessagePack {
    fn encode(&self, value: Value) -> Result<Value, SerializationError> {
        let bytes = rmp_serde::to_vec(&value)?;
        Ok(Value::Bytes(bytes.into()))
    }

    fn decode(&self, wire: Value) -> Result<Value, DeserializationError> {
        let Some(bytes) = wire.as_bytes() else {
            return Err(DeserializationError::new(format!(
                "MessagePack payload must be bytes, got {}",
                wire.kind()
            )));
        };

        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::new(format!(
                    "Data size {} exceeds maximum allowed size {}",
                    bytes.len(),
                    max_size
                )));
            }
        }

        Ok(rmp_serde::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({
            "id": 42,
            "text": "Hello, world!",
            "values": [1, 2, 3, 4, 5],
            "ratio": 0.5,
            "nothing": null,
        }))
    }

    #[test]
    fn test_msgpack_basic() {
        let strategy = MessagePack::default();
        let wire = strategy.encode(sample()).unwrap();
        assert!(wire.as_bytes().is_some());
        assert_eq!(strategy.decode(wire).unwrap(), sample());
    }

    #[test]
    fn test_msgpack_scalars() {
        let strategy = MessagePack::default();
        for value in [Value::Null, Value::from(true), Value::from(-7), Value::from("")] {
            let wire = strategy.encode(value.clone()).unwrap();
            assert_eq!(strategy.decode(wire).unwrap(), value);
        }
    }

    #[test]
    fn test_msgpack_duplicates_shared_nodes() {
        let strategy = MessagePack::default();
        let shared = Value::from(json!({"n": 1}));
        let value = Value::array(vec![shared.clone(), shared]);

        let decoded = strategy.decode(strategy.encode(value).unwrap()).unwrap();
        let items = decoded.as_array().unwrap();
        assert_eq!(items[0], items[1]);
        assert!(!Value::same_node(&items[0], &items[1]));
    }

    #[test]
    fn test_msgpack_rejects_non_bytes() {
        let strategy = MessagePack::default();
        let err = strategy.decode(Value::from("not bytes")).unwrap_err();
        assert!(err.message().contains("must be bytes"));
    }

    #[test]
    fn test_msgpack_invalid_data() {
        let strategy = MessagePack::default();
        let wire = Value::Bytes(vec![0xc1].into());
        assert!(strategy.decode(wire).is_err());
    }

    #[test]
    fn test_msgpack_max_size() {
        let strategy = MessagePack::new().with_max_size(4);
        let wire = strategy.encode(sample()).unwrap();
        let err = strategy.decode(wire.clone()).unwrap_err();
        assert!(err.message().contains("exceeds maximum"));

        let strategy = strategy.with_no_limit();
        assert!(strategy.decode(wire).is_ok());
    }

    #[test]
    fn test_msgpack_name() {
        assert_eq!(MessagePack::new().name(), "msgpack");
    }
}

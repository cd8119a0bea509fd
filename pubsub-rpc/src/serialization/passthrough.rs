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

//! Raw passthrough, the strategy used when a call names none.

use crate::Value;
use crate::serialization::{DeserializationError, SerializationError, Strategy};

/// Hands values through untouched.
///
/// No copy is made: the node the provider emitted is the node the caller
/// receives when the transport is in-process.
///
/// ```rust
/// use pubsub_rpc::serialization::{Passthrough, Strategy};
/// use pubsub_rpc::Value;
///
/// let value = Value::from(serde_json::json!({"a": [1, 2]}));
/// let received = Passthrough.decode(Passthrough.encode(value.clone()).unwrap()).unwrap();
/// assert!(Value::same_node(&value, &received));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl Strategy for Passthrough {
    fn encode(&self, value: Value) -> Result<Value, SerializationError> {
        Ok(value)
    }

    fn decode(&self, wire: Value) -> Result<Value, DeserializationError> {
        Ok(wire)
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

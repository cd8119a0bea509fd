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

//! Serialization layer for response payloads.
//!
//! Requests always travel as plain [`Value`]s. Response `data` payloads go
//! through a per-call [`Strategy`] selected by the optional `serialization`
//! tag carried in the request envelope:
//!
//! | Tag          | Strategy        | Wire form       | Shared nodes    |
//! |--------------|-----------------|-----------------|-----------------|
//! | *(absent)*   | [`Passthrough`] | the value       | kept as is      |
//! | `json-refs`  | [`JsonRefs`]    | JSON string     | restored        |
//! | `msgpack`    | [`MessagePack`] | bytes           | duplicated      |
//!
//! The provider encodes with the strategy the *request* named, so a single
//! provider can serve callers that chose different strategies.
//!
//! # Examples
//!
//! ```rust
//! use pubsub_rpc::serialization::{Serialization, strategy_for};
//! use pubsub_rpc::Value;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tag: Serialization = "json-refs".parse()?;
//! let strategy = strategy_for(Some(tag));
//!
//! let wire = strategy.encode(Value::from(serde_json::json!({"a": 1})))?;
//! assert_eq!(wire.as_str(), Some(r#"{"a":1}"#));
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - [`SerializationError`]: a value could not be encoded on the provider
//! - [`DeserializationError`]: a wire payload could not be decoded on the client

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod error;
mod json_refs;
mod msgpack;
mod passthrough;
mod traits;

pub use error::{DeserializationError, SerializationError};
pub use json_refs::JsonRefs;
pub use msgpack::MessagePack;
pub use passthrough::Passthrough;
pub use traits::Strategy;

#[cfg(doc)]
use crate::Value;

static PASSTHROUGH: Passthrough = Passthrough;
static JSON_REFS: JsonRefs = JsonRefs;
static MESSAGE_PACK: MessagePack = MessagePack::new();

/// Tag naming a serialization strategy on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Serialization {
    /// Reference-preserving JSON, see [`JsonRefs`].
    #[serde(rename = "json-refs")]
    JsonRefs,
    /// MessagePack, see [`MessagePack`].
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl Serialization {
    /// Returns the wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonRefs => "json-refs",
            Self::MessagePack => "msgpack",
        }
    }

    /// Returns the strategy registered for this tag.
    #[must_use]
    pub fn strategy(self) -> &'static dyn Strategy {
        match self {
            Self::JsonRefs => &JSON_REFS,
            Self::MessagePack => &MESSAGE_PACK,
        }
    }
}

impl fmt::Display for Serialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Serialization {
    type Err = DeserializationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "json-refs" => Ok(Self::JsonRefs),
            "msgpack" => Ok(Self::MessagePack),
            other => Err(DeserializationError::new(format!(
                "unsupported serialization \"{other}\""
            ))),
        }
    }
}

/// Returns the strategy for an optional tag. No tag means [`Passthrough`].
#[must_use]
pub fn strategy_for(tag: Option<Serialization>) -> &'static dyn Strategy {
    match tag {
        Some(tag) => tag.strategy(),
        None => &PASSTHROUGH,
    }
}

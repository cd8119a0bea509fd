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

//! Envelope model.
//!
//! Every event exchanged on a channel carries one envelope, an object whose
//! `type` field selects its shape:
//!
//! | `type`                | Direction          | Shape                                        |
//! |-----------------------|--------------------|----------------------------------------------|
//! | `request`             | client → provider  | `{uid, name, args, serialization?}`          |
//! | `unsubscribe-request` | client → provider  | `{uid, name, reason}`                        |
//! | `response`            | provider → client  | `{uid, name}` + `{data}`, `{complete: true}` or `{error}` |
//!
//! Envelopes are immutable records. They convert to [`Value`] objects with
//! `into_value` and back with [`Envelope::from_value`]. Converting never copies
//! payload nodes, so a passthrough `data` value keeps its identity.
//!
//! # Example
//!
//! ```rust
//! use pubsub_rpc::envelope::{Envelope, RequestEnvelope, Uid};
//! use pubsub_rpc::Value;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = RequestEnvelope {
//!     uid: Uid::new(),
//!     name: "ping".to_string(),
//!     args: vec![Value::from("123")],
//!     serialization: None,
//! };
//!
//! let wire = request.clone().into_value();
//! assert_eq!(wire.get("type").and_then(Value::as_str), Some("request"));
//!
//! match Envelope::from_value(&wire)? {
//!     Envelope::Request(parsed) => assert_eq!(parsed, request),
//!     other => panic!("unexpected envelope: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod uid;

pub use error::EnvelopeError;
pub use uid::Uid;

use std::fmt;

use crate::serialization::Serialization;
use crate::value::{Map, Value};

/// `type` of request envelopes.
pub const TYPE_REQUEST: &str = "request";
/// `type` of cancel envelopes.
pub const TYPE_CANCEL: &str = "unsubscribe-request";
/// `type` of response envelopes.
pub const TYPE_RESPONSE: &str = "response";

/// A call request emitted by a client.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEnvelope {
    /// Correlation id.
    pub uid: Uid,
    /// Action to invoke.
    pub name: String,
    /// Positional arguments. Empty for argument-less calls.
    pub args: Vec<Value>,
    /// Strategy the provider must use for `data` payloads.
    pub serialization: Option<Serialization>,
}

impl RequestEnvelope {
    /// Converts this envelope into its wire object.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = header(&self.uid, TYPE_REQUEST, self.name);
        map.insert("args".to_owned(), Value::array(self.args));
        if let Some(tag) = self.serialization {
            map.insert("serialization".to_owned(), Value::from(tag.as_str()));
        }
        Value::object(map)
    }
}

/// Why a client abandoned a call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The call timed out before the first response.
    Timeout,
    /// The caller's finish signal settled.
    FinishSignal,
    /// A reason this crate does not emit itself.
    Other(String),
}

impl CancelReason {
    /// Returns the wire text of the reason.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Timeout => "timeout",
            Self::FinishSignal => "finish-signal",
            Self::Other(reason) => reason,
        }
    }
}

impl From<&str> for CancelReason {
    fn from(value: &str) -> Self {
        match value {
            "timeout" => Self::Timeout,
            "finish-signal" => Self::FinishSignal,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cancellation emitted by a client for an in-flight call.
#[derive(Clone, Debug, PartialEq)]
pub struct CancelEnvelope {
    /// Correlation id of the call being cancelled.
    pub uid: Uid,
    /// Action the call invoked.
    pub name: String,
    /// Why the call was abandoned.
    pub reason: CancelReason,
}

impl CancelEnvelope {
    /// Converts this envelope into its wire object.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = header(&self.uid, TYPE_CANCEL, self.name);
        map.insert("reason".to_owned(), Value::from(self.reason.as_str()));
        Value::object(map)
    }
}

/// The payload part of a response envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// One emitted value, already encoded with the call's strategy.
    Data(Value),
    /// The action finished; no further responses follow.
    Complete,
    /// The action failed; carries a serialized remote error.
    Error(Value),
}

impl ResponseBody {
    /// Returns `true` for `Complete` and `Error`, which end the call.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }
}

/// A response emitted by a provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseEnvelope {
    /// Correlation id of the request being answered.
    pub uid: Uid,
    /// Action that produced the response.
    pub name: String,
    /// Payload.
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    /// Converts this envelope into its wire object.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = header(&self.uid, TYPE_RESPONSE, self.name);
        match self.body {
            ResponseBody::Data(data) => map.insert("data".to_owned(), data),
            ResponseBody::Complete => map.insert("complete".to_owned(), Value::Bool(true)),
            ResponseBody::Error(error) => map.insert("error".to_owned(), error),
        };
        Value::object(map)
    }
}

/// Any envelope, as read from an inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// A call request.
    Request(RequestEnvelope),
    /// A call cancellation.
    Cancel(CancelEnvelope),
    /// A call response.
    Response(ResponseEnvelope),
}

impl Envelope {
    /// Reads an envelope from a wire object.
    ///
    /// A response without `data`, `complete` or `error` is read as `data:
    /// null`, the answer of an action producing no value.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] for payloads that are not envelopes.
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        let map = value
            .as_object()
            .ok_or(EnvelopeError::NotAnObject { kind: value.kind() })?;

        let ty = required_str(map, "type")?;
        let uid = Uid::from(required_str(map, "uid")?);
        let name = required_str(map, "name")?.to_owned();

        match ty {
            TYPE_REQUEST => {
                let args = match map.get("args") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items.as_ref().clone(),
                    Some(_) => {
                        return Err(EnvelopeError::InvalidField {
                            field: "args",
                            expected: "an array",
                        });
                    }
                };
                let serialization = match map.get("serialization") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(tag)) => match tag.parse::<Serialization>() {
                        Ok(tag) => Some(tag),
                        Err(_) => {
                            return Err(EnvelopeError::UnsupportedSerialization {
                                uid,
                                name,
                                tag: tag.clone(),
                            });
                        }
                    },
                    Some(_) => {
                        return Err(EnvelopeError::InvalidField {
                            field: "serialization",
                            expected: "a string",
                        });
                    }
                };
                Ok(Self::Request(RequestEnvelope {
                    uid,
                    name,
                    args,
                    serialization,
                }))
            }
            TYPE_CANCEL => {
                let reason = match map.get("reason") {
                    Some(Value::String(reason)) => CancelReason::from(reason.as_str()),
                    None | Some(Value::Null) => CancelReason::Other(String::new()),
                    Some(_) => {
                        return Err(EnvelopeError::InvalidField {
                            field: "reason",
                            expected: "a string",
                        });
                    }
                };
                Ok(Self::Cancel(CancelEnvelope { uid, name, reason }))
            }
            TYPE_RESPONSE => {
                let body = if map.get("complete").and_then(Value::as_bool) == Some(true) {
                    ResponseBody::Complete
                } else if let Some(data) = map.get("data") {
                    ResponseBody::Data(data.clone())
                } else if let Some(error) = map.get("error") {
                    ResponseBody::Error(error.clone())
                } else {
                    ResponseBody::Data(Value::Null)
                };
                Ok(Self::Response(ResponseEnvelope { uid, name, body }))
            }
            other => Err(EnvelopeError::UnknownType { ty: other.to_owned() }),
        }
    }

    /// Converts this envelope into its wire object.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Request(envelope) => envelope.into_value(),
            Self::Cancel(envelope) => envelope.into_value(),
            Self::Response(envelope) => envelope.into_value(),
        }
    }

    /// Returns the correlation id.
    #[must_use]
    pub const fn uid(&self) -> &Uid {
        match self {
            Self::Request(envelope) => &envelope.uid,
            Self::Cancel(envelope) => &envelope.uid,
            Self::Response(envelope) => &envelope.uid,
        }
    }

    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Request(envelope) => &envelope.name,
            Self::Cancel(envelope) => &envelope.name,
            Self::Response(envelope) => &envelope.name,
        }
    }
}

fn header(uid: &Uid, ty: &str, name: String) -> Map {
    let mut map = Map::new();
    map.insert("uid".to_owned(), Value::from(uid.as_str()));
    map.insert("type".to_owned(), Value::from(ty));
    map.insert("name".to_owned(), Value::String(name));
    map
}

fn required_str<'a>(map: &'a Map, field: &'static str) -> Result<&'a str, EnvelopeError> {
    match map.get(field) {
        Some(Value::String(text)) => Ok(text),
        Some(_) => Err(EnvelopeError::InvalidField {
            field,
            expected: "a string",
        }),
        None => Err(EnvelopeError::MissingField { field }),
    }
}

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

//! Error types.
//!
//! Errors are layered the way calls flow:
//!
//! - [`RemoteError`]: the wire shape `{name, message, data?}` a provider sends
//!   in an `error` response
//! - [`CallError`]: everything a caller can observe from one call
//! - [`ServiceError`]: the crate-level error composing the layers above with
//!   serialization, transport and configuration failures
//!
//! Providers never let an error or panic escape their dispatch loop; they
//! turn it into a [`RemoteError`] and answer with it.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::serialization::{DeserializationError, SerializationError};
use crate::transport::TransportError;
use crate::value::{Map, Value};

/// An error as it travels in a `response` envelope.
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::RemoteError;
///
/// let error = RemoteError::new("'w-456' can't be parsed");
/// assert_eq!(error.name, "Error");
///
/// let wire = error.to_value();
/// assert_eq!(RemoteError::from_value(&wire), error);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    /// Error class name, `"Error"` unless the raiser chose another.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    pub data: Option<Value>,
}

impl RemoteError {
    /// Name of the error raised for requests naming an unregistered action.
    pub const UNKNOWN_ACTION: &'static str = "UnknownAction";
    /// Name of the error raised when an action returns neither a future nor a
    /// stream.
    pub const UNSUPPORTED_RESULT: &'static str = "UnsupportedActionResultType";
    /// Name of the error raised when an action panics.
    pub const ACTION_PANIC: &'static str = "RemoteActionError";
    /// Name of the error raised when an emitted value cannot be encoded.
    pub const SERIALIZATION: &'static str = "SerializationError";

    /// Creates an error named `"Error"`.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_name("Error", message)
    }

    /// Creates an error with an explicit class name.
    pub fn with_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Captures any error's message.
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        Self::new(error.to_string())
    }

    /// Converts to the wire object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_owned(), Value::from(self.name.as_str()));
        map.insert("message".to_owned(), Value::from(self.message.as_str()));
        if let Some(data) = &self.data {
            map.insert("data".to_owned(), data.clone());
        }
        Value::object(map)
    }

    /// Reads the wire object leniently.
    ///
    /// Missing fields default to `"Error"` and `""`; a bare string becomes the
    /// message and any other non-object is kept as `data`.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                name: map
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Error")
                    .to_owned(),
                message: map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                data: map.get("data").cloned(),
            },
            Value::String(message) => Self::new(message.as_str()),
            other => Self::new("").with_data(other.clone()),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl StdError for RemoteError {}

/// Everything a caller can observe failing on one call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The provider has no action with this name.
    #[error("unknown action \"{action}\"")]
    UnknownAction {
        /// The requested action.
        action: String,
    },

    /// The action returned something other than a future or a stream.
    #[error("action \"{action}\" returned an unsupported result type")]
    UnsupportedActionResultType {
        /// The requested action.
        action: String,
    },

    /// The action failed on the provider.
    #[error("{0}")]
    Remote(RemoteError),

    /// No response arrived before the call timeout elapsed.
    #[error(
        "Invocation timeout of calling \"{action}\" method on \"{channel}\" channel with {}ms timeout",
        timeout.as_millis()
    )]
    Timeout {
        /// The requested action.
        action: String,
        /// The channel the request was emitted on.
        channel: String,
        /// The configured timeout.
        timeout: Duration,
    },

    /// The caller's finish signal ended the call before it produced a value.
    ///
    /// `reason` holds the signal's rejection, if it rejected.
    #[error(
        "call of \"{action}\" aborted by finish signal{}",
        reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default()
    )]
    AbortedByFinishSignal {
        /// The requested action.
        action: String,
        /// Rejection carried by the signal.
        reason: Option<RemoteError>,
    },

    /// The transport pair could not be resolved for this call.
    #[error(transparent)]
    TransportResolution(#[from] TransportError),

    /// A `data` payload could not be decoded with the call's strategy.
    #[error("failed to decode response of \"{action}\": {source}")]
    Decode {
        /// The requested action.
        action: String,
        /// The decoder failure.
        #[source]
        source: DeserializationError,
    },
}

impl CallError {
    /// Rebuilds a client-side error from an `error` envelope payload.
    ///
    /// Well-known remote names map back onto their own variants; everything
    /// else stays a [`CallError::Remote`].
    #[must_use]
    pub fn from_remote(action: &str, error: RemoteError) -> Self {
        match error.name.as_str() {
            RemoteError::UNKNOWN_ACTION => Self::UnknownAction {
                action: action.to_owned(),
            },
            RemoteError::UNSUPPORTED_RESULT => Self::UnsupportedActionResultType {
                action: action.to_owned(),
            },
            _ => Self::Remote(error),
        }
    }

    /// Returns `true` for [`CallError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` for [`CallError::Remote`].
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Returns the remote error, if the provider raised one.
    #[must_use]
    pub const fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(error) => Some(error),
            _ => None,
        }
    }
}

/// Crate-level error.
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::{CallError, ServiceError};
///
/// let error = ServiceError::from(CallError::UnknownAction { action: "nope".into() });
/// assert!(error.is_call_error());
/// assert_eq!(error.to_string(), "call error: unknown action \"nope\"");
/// ```
#[derive(Debug)]
pub enum ServiceError {
    /// A call failed.
    Call(CallError),

    /// The transport boundary failed.
    Transport(TransportError),

    /// A value could not be encoded.
    Serialization(SerializationError),

    /// A value could not be decoded.
    Deserialization(DeserializationError),

    /// The service configuration is invalid.
    Config(ConfigError),
}

impl ServiceError {
    /// Returns `true` if this is a call error.
    #[must_use]
    pub const fn is_call_error(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if retrying the same operation may succeed.
    ///
    /// Timeouts and transport resolution failures are transient; everything
    /// else fails the same way again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Call(CallError::Timeout { .. })
                | Self::Call(CallError::TransportResolution(_))
        )
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(e) => write!(f, "call error: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Serialization(e) => write!(f, "{}", e),
            Self::Deserialization(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Call(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Deserialization(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<CallError> for ServiceError {
    fn from(error: CallError) -> Self {
        Self::Call(error)
    }
}

impl From<TransportError> for ServiceError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<SerializationError> for ServiceError {
    fn from(error: SerializationError) -> Self {
        Self::Serialization(error)
    }
}

impl From<DeserializationError> for ServiceError {
    fn from(error: DeserializationError) -> Self {
        Self::Deserialization(error)
    }
}

impl From<ConfigError> for ServiceError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_wire_shape() {
        let error = RemoteError::with_name("TypeError", "bad").with_data(Value::from(7));
        assert_eq!(
            error.to_value().to_json(),
            serde_json::json!({"name": "TypeError", "message": "bad", "data": 7})
        );
        assert_eq!(RemoteError::from_value(&error.to_value()), error);
    }

    #[test]
    fn test_remote_error_lenient_parse() {
        let parsed = RemoteError::from_value(&Value::from(serde_json::json!({"message": "m"})));
        assert_eq!(parsed.name, "Error");
        assert_eq!(parsed.message, "m");

        let parsed = RemoteError::from_value(&Value::from("plain"));
        assert_eq!(parsed.message, "plain");

        let parsed = RemoteError::from_value(&Value::from(3));
        assert_eq!(parsed.data, Some(Value::from(3)));
    }

    #[test]
    fn test_remote_error_from_std_error() {
        let io = std::io::Error::other("disk full");
        assert_eq!(RemoteError::from_error(&io).message, "disk full");
    }

    #[test]
    fn test_timeout_message() {
        let error = CallError::Timeout {
            action: "ping".into(),
            channel: "ch".into(),
            timeout: Duration::from_millis(500),
        };
        assert_eq!(
            error.to_string(),
            "Invocation timeout of calling \"ping\" method on \"ch\" channel with 500ms timeout"
        );
        assert!(error.is_timeout());
    }

    #[test]
    fn test_finish_signal_message() {
        let plain = CallError::AbortedByFinishSignal {
            action: "ping".into(),
            reason: None,
        };
        assert_eq!(plain.to_string(), "call of \"ping\" aborted by finish signal");

        let rejected = CallError::AbortedByFinishSignal {
            action: "ping".into(),
            reason: Some(RemoteError::new("shutdown")),
        };
        assert_eq!(
            rejected.to_string(),
            "call of \"ping\" aborted by finish signal: Error: shutdown"
        );
    }

    #[test]
    fn test_rehydrate_well_known_names() {
        let unknown =
            CallError::from_remote("x", RemoteError::with_name(RemoteError::UNKNOWN_ACTION, ""));
        assert!(matches!(unknown, CallError::UnknownAction { action } if action == "x"));

        let unsupported = CallError::from_remote(
            "x",
            RemoteError::with_name(RemoteError::UNSUPPORTED_RESULT, ""),
        );
        assert!(matches!(unsupported, CallError::UnsupportedActionResultType { .. }));

        let other = CallError::from_remote("x", RemoteError::new("boom"));
        assert_eq!(other.remote().map(|e| e.message.as_str()), Some("boom"));
    }

    #[test]
    fn test_service_error_layers() {
        let error = ServiceError::from(TransportError::unavailable("down"));
        assert!(error.is_transport_error());
        assert!(error.is_recoverable());
        assert!(error.source().is_some());

        let error = ServiceError::from(CallError::Remote(RemoteError::new("x")));
        assert!(error.is_call_error());
        assert!(!error.is_recoverable());

        let error = ServiceError::from(ConfigError::EmptyChannel);
        assert!(error.is_config_error());
    }
}

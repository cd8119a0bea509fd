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

//! Serialization error types.
//!
//! This module defines the errors raised while encoding payloads for the wire
//! and decoding them on the other side.

use std::fmt;

/// Error that occurs while encoding a value for the wire.
///
/// Common causes include:
/// - A binary encoder rejecting the value
/// - A value that has no representation in the selected format
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::serialization::SerializationError;
///
/// let error = SerializationError::new("unsupported value");
/// assert!(error.to_string().contains("unsupported value"));
/// ```
#[derive(Debug)]
pub struct SerializationError {
    /// The underlying error message
    message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SerializationError {
    /// Creates a new serialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new serialization error with a message and source.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pubsub_rpc::serialization::SerializationError;
    ///
    /// let json_error = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err();
    /// let error = SerializationError::with_source("payload rejected", json_error);
    /// assert_eq!(error.message(), "payload rejected");
    /// ```
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error message without the source chain.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error that occurs while decoding a wire value.
///
/// Common causes include:
/// - Wire data produced by a different strategy than the one requested
/// - Corrupted or truncated binary data
/// - A dangling `$ref` marker in reference-preserving JSON
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::serialization::{DeserializationError, JsonRefs, Strategy};
/// use pubsub_rpc::Value;
///
/// let result = JsonRefs.decode(Value::from(42));
/// assert!(result.is_err());
/// ```
#[derive(Debug)]
pub struct DeserializationError {
    /// The underlying error message
    message: String,
    /// Optional source error
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DeserializationError {
    /// Creates a new deserialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new deserialization error with a message and source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error message without the source chain.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deserialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeserializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<rmp_serde::encode::Error> for SerializationError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::with_source("MessagePack encoding failed", err)
    }
}

impl From<rmp_serde::decode::Error> for DeserializationError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::with_source("MessagePack decoding failed", err)
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON encoding failed", err)
    }
}

impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON decoding failed", err)
    }
}

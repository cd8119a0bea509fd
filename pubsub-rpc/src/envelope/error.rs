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

//! Envelope parsing errors.

use std::fmt;

use super::Uid;

/// Errors produced while reading an envelope from an inbound event payload.
///
/// Dispatch loops log these at `warn` level and drop the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The payload is not an object.
    NotAnObject {
        /// Kind of value that was received instead.
        kind: &'static str,
    },

    /// A required field is missing.
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field holds a value of the wrong kind.
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// What the field should have held.
        expected: &'static str,
    },

    /// The `type` discriminator is not one this crate knows.
    UnknownType {
        /// The received discriminator.
        ty: String,
    },

    /// A well-formed request named a serialization tag this crate does not
    /// support.
    ///
    /// Unlike the other variants the request is addressable, so a provider
    /// answers it with an error response.
    UnsupportedSerialization {
        /// Correlation id of the request.
        uid: Uid,
        /// Action the request named.
        name: String,
        /// The unsupported tag.
        tag: String,
    },
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { kind } => write!(f, "envelope must be an object, got {kind}"),
            Self::MissingField { field } => write!(f, "envelope is missing \"{field}\""),
            Self::InvalidField { field, expected } => {
                write!(f, "envelope field \"{field}\" must be {expected}")
            }
            Self::UnknownType { ty } => write!(f, "unknown envelope type \"{ty}\""),
            Self::UnsupportedSerialization { uid, name, tag } => write!(
                f,
                "request {uid} for \"{name}\" uses unsupported serialization \"{tag}\""
            ),
        }
    }
}

impl std::error::Error for EnvelopeError {}

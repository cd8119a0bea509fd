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

//! Transport error types.

use thiserror::Error;

/// Errors raised at the transport boundary.
///
/// The transport itself never reports delivery failures; these errors come
/// from the adapters that locate a transport or read its callback arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A transport resolver could not produce an emitter/listener pair.
    ///
    /// This typically occurs when a lazily resolved connection is not yet or
    /// no longer established.
    #[error("transport unavailable: {reason}")]
    Unavailable {
        /// Description of why no transport could be resolved
        reason: String,
    },

    /// An on-event resolver could not extract the envelope from the raw
    /// listener arguments.
    #[error("failed to resolve event payload: {reason}")]
    Resolution {
        /// Description of what was missing from the arguments
        reason: String,
    },

    /// The listener stopped delivering events before the call ended.
    ///
    /// This occurs when the registry owning the subscription is dropped while
    /// calls are still in flight.
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Creates an [`Unavailable`](Self::Unavailable) error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a [`Resolution`](Self::Resolution) error.
    pub fn resolution(reason: impl Into<String>) -> Self {
        Self::Resolution {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            TransportError::unavailable("socket down").to_string(),
            "transport unavailable: socket down"
        );
        assert_eq!(
            TransportError::resolution("no arguments").to_string(),
            "failed to resolve event payload: no arguments"
        );
        assert_eq!(TransportError::Closed.to_string(), "transport is closed");
    }
}

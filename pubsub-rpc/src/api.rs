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

//! Action shapes of a service.
//!
//! An [`ApiDefinition`] lists the actions a service exposes and the
//! [`OutputMode`] of each. Clients use it to choose the reply shape of a
//! call; payloads themselves stay dynamic [`Value`](crate::Value)s.

use std::collections::BTreeMap;
use std::fmt;

/// How a call hands its results to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// One value, as a future.
    Single,
    /// Any number of values, as a `futures::Stream`.
    #[default]
    Stream,
    /// Any number of values, pushed to an observer.
    Subscription,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Stream => "stream",
            Self::Subscription => "subscription",
        })
    }
}

/// One entry of an [`ApiDefinition`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Action name, as carried in envelopes.
    pub name: String,
    /// Reply shape.
    pub mode: OutputMode,
}

/// The declared actions of a service.
///
/// Names that are not declared are treated as [`OutputMode::Stream`].
///
/// # Examples
///
/// ```rust
/// use pubsub_rpc::{ApiDefinition, OutputMode};
///
/// let api = ApiDefinition::new()
///     .single("ping")
///     .stream("evensOnly")
///     .subscription("ticks");
///
/// assert_eq!(api.mode_of("ping"), OutputMode::Single);
/// assert_eq!(api.mode_of("undeclared"), OutputMode::Stream);
/// assert_eq!(api.len(), 3);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiDefinition {
    actions: BTreeMap<String, OutputMode>,
}

impl ApiDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with `mode`, replacing any earlier declaration.
    #[must_use]
    pub fn with_action(mut self, name: impl Into<String>, mode: OutputMode) -> Self {
        self.actions.insert(name.into(), mode);
        self
    }

    /// Declares a single-value action.
    #[must_use]
    pub fn single(self, name: impl Into<String>) -> Self {
        self.with_action(name, OutputMode::Single)
    }

    /// Declares a streaming action.
    #[must_use]
    pub fn stream(self, name: impl Into<String>) -> Self {
        self.with_action(name, OutputMode::Stream)
    }

    /// Declares a subscription action.
    #[must_use]
    pub fn subscription(self, name: impl Into<String>) -> Self {
        self.with_action(name, OutputMode::Subscription)
    }

    /// Returns the reply shape of `name`.
    #[must_use]
    pub fn mode_of(&self, name: &str) -> OutputMode {
        self.actions.get(name).copied().unwrap_or_default()
    }

    /// Returns `true` if `name` was declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Returns the number of declared actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns `true` if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterates the declarations in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = ActionDescriptor> + '_ {
        self.actions.iter().map(|(name, mode)| ActionDescriptor {
            name: name.clone(),
            mode: *mode,
        })
    }
}

impl FromIterator<ActionDescriptor> for ApiDefinition {
    fn from_iter<I: IntoIterator<Item = ActionDescriptor>>(iter: I) -> Self {
        Self {
            actions: iter
                .into_iter()
                .map(|descriptor| (descriptor.name, descriptor.mode))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclaration_replaces() {
        let api = ApiDefinition::new().single("a").stream("a");
        assert_eq!(api.mode_of("a"), OutputMode::Stream);
        assert_eq!(api.len(), 1);
    }

    #[test]
    fn test_descriptors_round_trip() {
        let api = ApiDefinition::new().subscription("b").single("a");
        let descriptors: Vec<_> = api.descriptors().collect();
        assert_eq!(descriptors[0].name, "a");
        assert_eq!(descriptors[1].mode, OutputMode::Subscription);

        let rebuilt: ApiDefinition = descriptors.into_iter().collect();
        assert_eq!(rebuilt, api);
    }

    #[test]
    fn test_empty() {
        let api = ApiDefinition::default();
        assert!(api.is_empty());
        assert!(!api.contains("x"));
        assert_eq!(OutputMode::default().to_string(), "stream");
    }
}

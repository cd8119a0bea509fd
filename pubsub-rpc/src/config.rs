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

//! Service configuration.
//!
//! [`ServiceConfig`] carries the settings shared by every call and
//! registration of one service: the channel, the default call timeout, and
//! the defaults for the listen channel, serialization strategy and logger.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::logging::{NoopLogger, SharedLogger};
use crate::serialization::Serialization;

/// Call timeout used when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The service channel is empty.
    #[error("service channel must not be empty")]
    EmptyChannel,

    /// A listen channel override is present but empty.
    #[error("listen channel must not be empty when set")]
    EmptyListenChannel,

    /// The JSON document could not be read.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for one service.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Channel requests are emitted on and providers listen to.
    ///
    /// Responses are emitted on this channel too.
    pub channel: String,

    /// Timeout applied to calls that do not set their own.
    ///
    /// Default: 3 seconds
    pub default_timeout: Duration,

    /// Channel calls listen on for responses, when different from
    /// [`channel`](Self::channel).
    ///
    /// Default: None (same as `channel`)
    pub listen_channel: Option<String>,

    /// Strategy calls request by default.
    ///
    /// Default: None (passthrough)
    pub serialization: Option<Serialization>,

    /// Logger for the engines. Client and provider messages are scoped with
    /// `[client]` and `[provider]`.
    ///
    /// Default: [`NoopLogger`]
    pub logger: SharedLogger,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            default_timeout: DEFAULT_CALL_TIMEOUT,
            listen_channel: None,
            serialization: None,
            logger: Arc::new(NoopLogger),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("channel", &self.channel)
            .field("default_timeout", &self.default_timeout)
            .field("listen_channel", &self.listen_channel)
            .field("serialization", &self.serialization)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDocument {
    channel: String,
    #[serde(default)]
    default_timeout_ms: Option<u64>,
    #[serde(default)]
    listen_channel: Option<String>,
    #[serde(default)]
    serialization: Option<Serialization>,
}

impl ServiceConfig {
    /// Creates a configuration for `channel` with default values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use pubsub_rpc::ServiceConfig;
    ///
    /// let config = ServiceConfig::new("my-api");
    /// assert_eq!(config.channel, "my-api");
    /// assert_eq!(config.default_timeout, Duration::from_secs(3));
    /// ```
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Self::default()
        }
    }

    /// Sets the default call timeout.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use pubsub_rpc::ServiceConfig;
    ///
    /// let config = ServiceConfig::new("my-api").with_default_timeout(Duration::from_millis(500));
    /// assert_eq!(config.default_timeout.as_millis(), 500);
    /// ```
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the default listen channel.
    #[must_use]
    pub fn with_listen_channel(mut self, channel: impl Into<String>) -> Self {
        self.listen_channel = Some(channel.into());
        self
    }

    /// Sets the default serialization strategy.
    #[must_use]
    pub fn with_serialization(mut self, serialization: Serialization) -> Self {
        self.serialization = Some(serialization);
        self
    }

    /// Sets the logger.
    #[must_use]
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Checks the configuration for values no service can run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyChannel`] or
    /// [`ConfigError::EmptyListenChannel`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.is_empty() {
            return Err(ConfigError::EmptyChannel);
        }
        if self.listen_channel.as_deref() == Some("") {
            return Err(ConfigError::EmptyListenChannel);
        }
        Ok(())
    }

    /// Reads a configuration from a JSON document.
    ///
    /// The logger cannot be expressed in JSON and is left at its default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and the
    /// [`validate`](Self::validate) errors for invalid values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pubsub_rpc::ServiceConfig;
    /// use pubsub_rpc::serialization::Serialization;
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ServiceConfig::from_json_str(
    ///     r#"{"channel": "my-api", "default_timeout_ms": 750, "serialization": "msgpack"}"#,
    /// )?;
    /// assert_eq!(config.default_timeout.as_millis(), 750);
    /// assert_eq!(config.serialization, Some(Serialization::MessagePack));
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(text)?;
        let config = Self {
            channel: document.channel,
            default_timeout: document
                .default_timeout_ms
                .map_or(DEFAULT_CALL_TIMEOUT, Duration::from_millis),
            listen_channel: document.listen_channel,
            serialization: document.serialization,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Returns the channel calls listen on for responses by default.
    #[must_use]
    pub fn effective_listen_channel(&self) -> &str {
        self.listen_channel.as_deref().unwrap_or(&self.channel)
    }
}

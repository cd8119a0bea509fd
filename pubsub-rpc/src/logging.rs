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

//! Logging contract.
//!
//! The engines log through the [`Logger`] trait rather than a concrete sink,
//! so embedders can route protocol diagnostics wherever their application
//! logs go. Five levels exist, mirroring the usual JavaScript logger shape:
//! `error`, `warn`, `info`, `verbose` and `debug`.
//!
//! - [`NoopLogger`] discards everything and is the default.
//! - [`TracingLogger`] (feature `observability`) forwards to `tracing` with
//!   target `pubsub_rpc`.
//! - [`PrefixedLogger`] scopes another logger, for example `[client]`.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use pubsub_rpc::logging::{Logger, NoopLogger, PrefixedLogger, SharedLogger};
//!
//! let base: SharedLogger = Arc::new(NoopLogger);
//! let client = PrefixedLogger::scoped(&base, "[client]");
//! client.debug(format_args!("request emitted, uid={}", "abc"));
//! ```

use std::fmt;
use std::sync::Arc;

/// Severity of a log record, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Failures.
    Error,
    /// Ignored input and recoverable problems.
    Warn,
    /// Lifecycle events such as registration.
    Info,
    /// Chatty lifecycle detail.
    Verbose,
    /// Per-envelope tracing.
    Debug,
}

impl LogLevel {
    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for protocol diagnostics.
///
/// Only [`log`](Logger::log) is required; the per-level methods forward to it.
pub trait Logger: Send + Sync {
    /// Records one message.
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>);

    /// Records an error.
    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }

    /// Records a warning.
    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, args);
    }

    /// Records an informational message.
    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    /// Records a verbose message.
    fn verbose(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Verbose, args);
    }

    /// Records a debug message.
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }
}

/// A logger shared between engines and calls.
pub type SharedLogger = Arc<dyn Logger>;

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Forwards messages to `tracing` events with target `pubsub_rpc`.
///
/// `verbose` maps to `DEBUG` and `debug` to `TRACE`.
#[cfg(feature = "observability")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "observability")]
impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        match level {
            LogLevel::Error => tracing::error!(target: "pubsub_rpc", "{}", args),
            LogLevel::Warn => tracing::warn!(target: "pubsub_rpc", "{}", args),
            LogLevel::Info => tracing::info!(target: "pubsub_rpc", "{}", args),
            LogLevel::Verbose => tracing::debug!(target: "pubsub_rpc", "{}", args),
            LogLevel::Debug => tracing::trace!(target: "pubsub_rpc", "{}", args),
        }
    }
}

/// Prepends a fixed prefix to every message of an inner logger.
pub struct PrefixedLogger {
    inner: SharedLogger,
    prefix: String,
}

impl PrefixedLogger {
    /// Wraps `inner`, prefixing messages with `prefix`.
    pub fn new(inner: SharedLogger, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// Returns a shared logger scoped by `prefix`.
    ///
    /// Scopes nest: scoping `[pubsub-rpc]` by `[client]` logs
    /// `[pubsub-rpc] [client] ...`.
    #[must_use]
    pub fn scoped(inner: &SharedLogger, prefix: &str) -> SharedLogger {
        Arc::new(Self::new(inner.clone(), prefix))
    }

    /// Returns the prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Logger for PrefixedLogger {
    fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.inner.log(level, format_args!("{} {}", self.prefix, args));
    }
}

impl fmt::Debug for PrefixedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixedLogger")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Prefix of every message the crate logs.
pub const MODULE_PREFIX: &str = "[pubsub-rpc]";

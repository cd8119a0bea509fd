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

//! The service facade.

use std::fmt;
use std::sync::Arc;

use crate::api::ApiDefinition;
use crate::client::{BoundCall, CallOptions, Caller, Client};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::logging::{Logger, MODULE_PREFIX, PrefixedLogger};
use crate::provider::{Actions, Provider, RegisterOptions, Registration};
use crate::registry::Registry;
use crate::transport::{Emitters, EmittersSource};

/// One service channel, usable from both sides.
///
/// A process can register actions, call them, or both; client and provider
/// only share the configuration and the [`Registry`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use pubsub_rpc::client::CallOptions;
/// use pubsub_rpc::provider::{Actions, RegisterOptions};
/// use pubsub_rpc::transport::EventBus;
/// use pubsub_rpc::{ApiDefinition, Service, ServiceConfig, Value};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = EventBus::shared();
/// let api = ApiDefinition::new().single("add");
/// let service = Service::new(ServiceConfig::new("math"), api)?;
///
/// let _registration = service.register(
///     Actions::new().with_future("add", |_ctx, args| async move {
///         let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
///         Ok(Value::from(sum))
///     }),
///     &bus,
///     RegisterOptions::new(),
/// );
///
/// let sum = service
///     .call("add", CallOptions::new(), &bus)
///     .invoke(vec![Value::from(2), Value::from(3)])
///     .into_single()
///     .expect("declared single")
///     .await?;
/// assert_eq!(sum.as_i64(), Some(5));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Service {
    config: Arc<ServiceConfig>,
    client: Client,
    provider: Provider,
    registry: Arc<Registry>,
}

impl Service {
    /// Creates a service with its own registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when `config` does not validate.
    pub fn new(config: ServiceConfig, api: ApiDefinition) -> Result<Self, ServiceError> {
        Self::with_registry(config, api, Arc::new(Registry::new()))
    }

    /// Creates a service recording into a shared registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] when `config` does not validate.
    pub fn with_registry(
        config: ServiceConfig,
        api: ApiDefinition,
        registry: Arc<Registry>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        PrefixedLogger::new(config.logger.clone(), MODULE_PREFIX).info(format_args!(
            "service created, channel=\"{}\", actions: {}",
            config.channel,
            api.len()
        ));
        let client = Client::new(&config, Arc::new(api), registry.clone());
        let provider = Provider::new(&config, registry.clone());
        Ok(Self {
            config: Arc::new(config),
            client,
            provider,
            registry,
        })
    }

    /// Answers requests for `actions` arriving on `emitters`.
    ///
    /// See [`Provider::register`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn register(
        &self,
        actions: Actions,
        emitters: impl Into<Emitters>,
        options: RegisterOptions,
    ) -> Registration {
        self.provider.register(actions, emitters, options)
    }

    /// Prepares a call of `name` over `emitters`.
    #[must_use]
    pub fn call(
        &self,
        name: &str,
        options: CallOptions,
        emitters: impl Into<EmittersSource>,
    ) -> BoundCall {
        self.client.call(name, options, emitters)
    }

    /// Binds a transport and default options for repeated calls.
    #[must_use]
    pub fn caller(&self, emitters: impl Into<EmittersSource>, defaults: CallOptions) -> Caller {
        Caller::new(self.client.clone(), emitters.into(), defaults)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_invalid_config_is_rejected() {
        let error = Service::new(ServiceConfig::default(), ApiDefinition::new()).unwrap_err();
        assert!(error.is_config_error());
        assert!(matches!(error, ServiceError::Config(ConfigError::EmptyChannel)));
    }

    #[test]
    fn test_shared_registry() {
        let registry = Arc::new(Registry::new());
        let a =
            Service::with_registry(ServiceConfig::new("a"), ApiDefinition::new(), registry.clone())
                .unwrap();
        let b =
            Service::with_registry(ServiceConfig::new("b"), ApiDefinition::new(), registry.clone())
                .unwrap();
        assert!(Arc::ptr_eq(a.registry(), b.registry()));
        assert_eq!(b.config().channel, "b");
    }
}

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

use std::fmt;

use crate::client::{BoundCall, CallOptions, CallOverrides, Client};
use crate::transport::EmittersSource;

/// A client bound to one transport pair and a set of default options.
///
/// Created by [`Service::caller`](crate::Service::caller).
#[derive(Clone)]
pub struct Caller {
    client: Client,
    source: EmittersSource,
    defaults: CallOptions,
}

impl Caller {
    pub(crate) fn new(client: Client, source: EmittersSource, defaults: CallOptions) -> Self {
        Self {
            client,
            source,
            defaults,
        }
    }

    /// Prepares a call of `name`, with `overrides` taking precedence over the
    /// caller's defaults.
    #[must_use]
    pub fn call(&self, name: &str, overrides: CallOverrides) -> BoundCall {
        self.client.call(
            name,
            overrides.merged_over(&self.defaults),
            self.source.clone(),
        )
    }

    /// Returns the defaults every call starts from.
    #[must_use]
    pub const fn defaults(&self) -> &CallOptions {
        &self.defaults
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caller")
            .field("source", &self.source)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

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

//! # Calculator Example
//!
//! A provider and a client sharing one in-process [`EventBus`], with engine
//! logs forwarded to `tracing`.
//!
//! ## What This Example Shows
//!
//! - Declaring single-value and streaming actions
//! - Registering a provider and calling it
//! - Error relay (division by zero)
//! - Call timeouts
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=pubsub_rpc=trace cargo run --example calculator
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pubsub_rpc::client::CallOptions;
use pubsub_rpc::logging::TracingLogger;
use pubsub_rpc::provider::{Actions, RegisterOptions};
use pubsub_rpc::transport::EventBus;
use pubsub_rpc::{ApiDefinition, RemoteError, Service, ServiceConfig, Value};
use tracing_subscriber::EnvFilter;

fn numbers(args: &[Value]) -> Result<(i64, i64), RemoteError> {
    match args {
        [a, b] => a
            .as_i64()
            .zip(b.as_i64())
            .ok_or_else(|| RemoteError::with_name("TypeError", "expected two integers")),
        _ => Err(RemoteError::with_name("TypeError", "expected two arguments")),
    }
}

fn calculator() -> Actions {
    Actions::new()
        .with_future("add", |_ctx, args| async move {
            let (a, b) = numbers(&args)?;
            Ok(Value::from(a + b))
        })
        .with_future("divide", |_ctx, args| async move {
            let (a, b) = numbers(&args)?;
            if b == 0 {
                return Err(RemoteError::with_name("RangeError", "division by zero"));
            }
            Ok(Value::from(a / b))
        })
        .with_stream("countdown", |_ctx, args| {
            let from = args.first().and_then(Value::as_i64).unwrap_or(3);
            futures::stream::unfold(from, |n| async move {
                if n < 0 {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                Some((Ok(Value::from(n)), n - 1))
            })
        })
        .with_future("sleepy", |_ctx, _args| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pubsub_rpc=debug")),
        )
        .init();

    let bus = EventBus::shared();
    let api = ApiDefinition::new()
        .single("add")
        .single("divide")
        .stream("countdown")
        .single("sleepy");
    let config = ServiceConfig::new("calculator")
        .with_default_timeout(Duration::from_secs(1))
        .with_logger(Arc::new(TracingLogger));
    let service = Service::new(config, api)?;

    let registration = service.register(calculator(), &bus, RegisterOptions::new());
    let caller = service.caller(&bus, CallOptions::new());

    let sum = caller
        .call("add", CallOptions::new())
        .invoke(vec![Value::from(2), Value::from(3)])
        .into_single()
        .ok_or("add is declared single")?
        .await?;
    println!("2 + 3 = {sum}");

    match caller
        .call("divide", CallOptions::new())
        .invoke(vec![Value::from(1), Value::from(0)])
        .into_single()
        .ok_or("divide is declared single")?
        .await
    {
        Ok(value) => println!("1 / 0 = {value}"),
        Err(error) => println!("1 / 0 failed: {error}"),
    }

    let mut countdown = caller
        .call("countdown", CallOptions::new())
        .invoke(vec![Value::from(3)])
        .into_stream()
        .ok_or("countdown is declared stream")?;
    while let Some(tick) = countdown.next().await {
        println!("countdown: {}", tick?);
    }

    let timed_out = caller
        .call(
            "sleepy",
            CallOptions::new().with_timeout(Duration::from_millis(200)),
        )
        .invoke(Vec::new())
        .into_single()
        .ok_or("sleepy is declared single")?
        .await;
    if let Err(error) = timed_out {
        println!("{error}");
    }

    println!("provider stats: {:?}", registration.stats());
    println!(
        "calls started: {}, timed out: {}",
        service.registry().call_metrics().total_started(),
        service.registry().call_metrics().total_timed_out()
    );
    registration.deregister();
    Ok(())
}

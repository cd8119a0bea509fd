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

//! Integration tests for request/response correlation.
//!
//! These tests run a client and a provider over one in-process bus and
//! verify:
//! - Concurrent calls only see their own responses
//! - One transport subscription is shared by all calls on a channel
//! - Stream values arrive once and in order
//! - Argument-less calls and serialization strategies survive the trip

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::join_all;
use parking_lot::Mutex;
use pubsub_rpc::client::CallOptions;
use pubsub_rpc::envelope::Envelope;
use pubsub_rpc::provider::{Actions, RegisterOptions};
use pubsub_rpc::transport::{EventBus, EventHandler, EventListener};
use pubsub_rpc::{ApiDefinition, Serialization, Service, ServiceConfig, Value};

fn api() -> ApiDefinition {
    ApiDefinition::new()
        .single("echo")
        .single("slowEcho")
        .stream("count")
        .single("shape")
}

fn actions() -> Actions {
    Actions::new()
        .with_future("echo", |_ctx, args| async move {
            Ok(args.into_iter().next().unwrap_or(Value::Null))
        })
        .with_future("slowEcho", |_ctx, args| async move {
            let value = args.into_iter().next().unwrap_or(Value::Null);
            // Later requests answer first.
            let delay = 50 - value.as_i64().unwrap_or(0).min(50);
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            Ok(value)
        })
        .with_stream("count", |_ctx, args| {
            let to = args.first().and_then(Value::as_i64).unwrap_or(0);
            futures::stream::iter((1..=to).map(|n| Ok(Value::from(n))))
        })
        .with_future("shape", |_ctx, args| async move {
            let first = args.first().cloned().unwrap_or(Value::Null);
            Ok(Value::from_pairs([
                ("count", Value::from(args.len())),
                ("first", first),
            ]))
        })
}

fn service() -> Service {
    Service::new(ServiceConfig::new("svc"), api()).unwrap()
}

fn record_requests(bus: &Arc<EventBus>) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: EventHandler = Arc::new(move |args: &[Value]| {
        if let Ok(Envelope::Request(_)) = Envelope::from_value(&args[0]) {
            sink.lock().push(args[0].clone());
        }
    });
    bus.on("svc", handler);
    seen
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_get_their_own_responses() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    let calls = (0..20_i64).map(|n| {
        service
            .call("slowEcho", CallOptions::new(), &bus)
            .invoke(vec![Value::from(n)])
            .into_single()
            .unwrap()
    });
    let results = join_all(calls).await;

    for (n, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap().as_i64(), Some(n as i64));
    }
}

#[tokio::test(start_paused = true)]
async fn test_calls_share_one_transport_subscription() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());
    let listener: Arc<dyn EventListener> = bus.clone();

    let calls: Vec<_> = (0..10_i64)
        .map(|n| {
            tokio::spawn(
                service
                    .call("slowEcho", CallOptions::new(), &bus)
                    .invoke(vec![Value::from(n)])
                    .into_single()
                    .unwrap(),
            )
        })
        .collect();

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // The provider's handler plus one shared client handler.
    assert_eq!(bus.listener_count("svc"), 2);
    let stats = service
        .registry()
        .multiplexer()
        .stats(&listener, "svc")
        .unwrap();
    assert_eq!(stats.ref_count, 10);
    assert_eq!(stats.subscribers, 10);
    assert_eq!(stats.channels_for_listener, 1);

    for call in calls {
        call.await.unwrap().unwrap();
    }
    assert_eq!(bus.listener_count("svc"), 1);
    assert_eq!(service.registry().multiplexer().listener_count(), 0);
    assert!(service.registry().multiplexer().stats(&listener, "svc").is_none());
}

#[tokio::test]
async fn test_stream_values_arrive_once_in_order() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    let values: Vec<i64> = service
        .call("count", CallOptions::new(), &bus)
        .invoke(vec![Value::from(5)])
        .into_stream()
        .unwrap()
        .map(|item| item.unwrap().as_i64().unwrap())
        .collect()
        .await;

    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_argument_less_call_sends_empty_args() {
    let bus = EventBus::shared();
    let requests = record_requests(&bus);
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    let shape = service
        .call("shape", CallOptions::new(), &bus)
        .invoke(Vec::new())
        .into_single()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(shape.get("count").and_then(Value::as_i64), Some(0));
    assert!(shape.get("first").unwrap().is_null());
    let requests = requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].get("args").and_then(Value::as_array).map(<[Value]>::len),
        Some(0)
    );
    assert!(requests[0].get("serialization").is_none());
}

#[tokio::test]
async fn test_json_refs_round_trip_preserves_shared_nodes() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(
        Actions::new().with_future("shared", |_ctx, _args| async {
            let o1 = Value::from(serde_json::json!({"n": 123, "o": {"s": "345"}}));
            Ok(Value::from_pairs([
                ("o1", o1.clone()),
                ("o1_list", Value::array(vec![o1.clone(), o1.clone(), o1])),
            ]))
        }),
        &bus,
        RegisterOptions::new(),
    );

    let value = service
        .call(
            "shared",
            CallOptions::new().with_serialization(Serialization::JsonRefs),
            &bus,
        )
        .invoke(Vec::new())
        .into_stream()
        .unwrap()
        .next()
        .await
        .unwrap()
        .unwrap();

    let o1 = value.get("o1").unwrap();
    let list = value.get("o1_list").and_then(Value::as_array).unwrap();
    assert_eq!(list.len(), 3);
    for item in list {
        assert!(Value::same_node(o1, item));
    }
    assert_eq!(
        o1.get("o").and_then(|o| o.get("s")).and_then(Value::as_str),
        Some("345")
    );
}

#[tokio::test]
async fn test_message_pack_round_trip() {
    let bus = EventBus::shared();
    let responses = Arc::new(Mutex::new(Vec::new()));
    let sink = responses.clone();
    let handler: EventHandler = Arc::new(move |args: &[Value]| {
        if let Ok(Envelope::Response(response)) = Envelope::from_value(&args[0]) {
            sink.lock().push(response.body);
        }
    });
    bus.on("svc", handler);

    let service = Service::new(
        ServiceConfig::new("svc").with_serialization(Serialization::MessagePack),
        api(),
    )
    .unwrap();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    let payload = Value::from(serde_json::json!({"id": 7, "tags": ["a", "b"]}));
    let echoed = service
        .call("echo", CallOptions::new(), &bus)
        .invoke(vec![payload.clone()])
        .into_single()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(echoed, payload);
    let responses = responses.lock();
    assert!(matches!(
        &responses[0],
        pubsub_rpc::envelope::ResponseBody::Data(Value::Bytes(_))
    ));
}

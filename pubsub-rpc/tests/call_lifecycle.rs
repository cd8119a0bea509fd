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

//! Integration tests for the ways a call can end early.
//!
//! Covers call timeouts and the cancellation they send to the provider,
//! finish signals, callers dropping their replies, and deregistration.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use pubsub_rpc::client::{CallOptions, FinishSignal};
use pubsub_rpc::envelope::{CancelReason, Envelope};
use pubsub_rpc::provider::{Actions, RegisterOptions};
use pubsub_rpc::transport::{EventBus, EventHandler, EventListener};
use pubsub_rpc::{ApiDefinition, CallError, RemoteError, Service, ServiceConfig, Value};

fn service() -> Service {
    let api = ApiDefinition::new()
        .single("slow")
        .stream("ticks")
        .single("never");
    Service::new(ServiceConfig::new("svc"), api).unwrap()
}

fn actions() -> Actions {
    Actions::new()
        .with_future("slow", |_ctx, _args| async {
            tokio::time::sleep(Duration::from_millis(750)).await;
            Ok(Value::from("done"))
        })
        .with_stream("ticks", |_ctx, _args| {
            futures::stream::unfold(0_i64, |n| async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Some((Ok(Value::from(n)), n + 1))
            })
        })
        .with_future("never", |_ctx, _args| futures::future::pending())
}

fn record_cancels(bus: &Arc<EventBus>) -> Arc<Mutex<Vec<CancelReason>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: EventHandler = Arc::new(move |args: &[Value]| {
        if let Ok(Envelope::Cancel(cancel)) = Envelope::from_value(&args[0]) {
            sink.lock().push(cancel.reason);
        }
    });
    bus.on("svc", handler);
    seen
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_retry_with_longer_timeout() {
    let bus = EventBus::shared();
    let cancels = record_cancels(&bus);
    let service = service();
    let registration = service.register(actions(), &bus, RegisterOptions::new());

    let error = service
        .call(
            "slow",
            CallOptions::new().with_timeout(Duration::from_millis(500)),
            &bus,
        )
        .invoke(Vec::new())
        .into_single()
        .unwrap()
        .await
        .unwrap_err();

    assert!(error.is_timeout());
    assert_eq!(
        error.to_string(),
        "Invocation timeout of calling \"slow\" method on \"svc\" channel with 500ms timeout"
    );
    assert_eq!(*cancels.lock(), vec![CancelReason::Timeout]);
    assert_eq!(registration.stats().active_invocations, 0);

    let value = service
        .call(
            "slow",
            CallOptions::new().with_timeout(Duration::from_millis(900)),
            &bus,
        )
        .invoke(Vec::new())
        .into_single()
        .unwrap()
        .await
        .unwrap();

    assert_eq!(value.as_str(), Some("done"));
    assert_eq!(cancels.lock().len(), 1);
    assert_eq!(service.registry().call_metrics().total_timed_out(), 1);
    assert_eq!(service.registry().call_metrics().total_completed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_uses_minimum_delay() {
    let bus = EventBus::shared();
    let cancels = record_cancels(&bus);
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    let started = tokio::time::Instant::now();
    let error = service
        .call("never", CallOptions::new().with_timeout(Duration::ZERO), &bus)
        .invoke(Vec::new())
        .into_single()
        .unwrap()
        .await
        .unwrap_err();

    assert!(error.is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(1));
    assert_eq!(*cancels.lock(), vec![CancelReason::Timeout]);
}

#[tokio::test(start_paused = true)]
async fn test_timer_only_races_the_first_response() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());

    // Ticks arrive every 10ms; the stream outlives the 25ms timeout.
    let values: Vec<_> = service
        .call(
            "ticks",
            CallOptions::new().with_timeout(Duration::from_millis(25)),
            &bus,
        )
        .invoke(Vec::new())
        .into_stream()
        .unwrap()
        .take(6)
        .collect()
        .await;

    assert_eq!(values.len(), 6);
    assert!(values.iter().all(Result::is_ok));
}

#[tokio::test(start_paused = true)]
async fn test_resolved_finish_signal_ends_stream() {
    let bus = EventBus::shared();
    let cancels = record_cancels(&bus);
    let service = service();
    let registration = service.register(actions(), &bus, RegisterOptions::new());
    let (trigger, signal) = FinishSignal::pair();

    let mut stream = service
        .call("ticks", CallOptions::new().with_finish_signal(signal), &bus)
        .invoke(Vec::new())
        .into_stream()
        .unwrap();

    for expected in 0..3 {
        assert_eq!(stream.next().await.unwrap().unwrap().as_i64(), Some(expected));
    }
    trigger.finish();

    while let Some(item) = stream.next().await {
        assert!(item.is_ok());
    }
    assert_eq!(*cancels.lock(), vec![CancelReason::FinishSignal]);
    assert_eq!(registration.stats().active_invocations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_finish_signal_before_any_value_aborts_single() {
    let bus = EventBus::shared();
    let cancels = record_cancels(&bus);
    let service = service();
    let registration = service.register(actions(), &bus, RegisterOptions::new());
    let (trigger, signal) = FinishSignal::pair();

    let reply = tokio::spawn(
        service
            .call(
                "never",
                CallOptions::new()
                    .with_timeout(Duration::from_secs(60))
                    .with_finish_signal(signal),
                &bus,
            )
            .invoke(Vec::new())
            .into_single()
            .unwrap(),
    );
    settle().await;
    assert_eq!(registration.stats().active_invocations, 1);
    trigger.finish();

    let error = reply.await.unwrap().unwrap_err();
    assert!(matches!(
        error,
        CallError::AbortedByFinishSignal { reason: None, .. }
    ));
    assert_eq!(*cancels.lock(), vec![CancelReason::FinishSignal]);
    assert_eq!(registration.stats().active_invocations, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_finish_signal_carries_reason() {
    let bus = EventBus::shared();
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());
    let (trigger, signal) = FinishSignal::pair();

    let mut stream = service
        .call("ticks", CallOptions::new().with_finish_signal(signal), &bus)
        .invoke(Vec::new())
        .into_stream()
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    trigger.fail(RemoteError::new("window closed"));

    let error = loop {
        match stream.next().await {
            Some(Ok(_)) => continue,
            Some(Err(error)) => break error,
            None => panic!("stream ended without the rejection"),
        }
    };
    let reason = match error {
        CallError::AbortedByFinishSignal {
            reason: Some(reason),
            ..
        } => reason,
        other => panic!("expected a rejected finish signal, got {other}"),
    };
    assert_eq!(reason.message, "window closed");
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_reply_releases_without_cancel() {
    let bus = EventBus::shared();
    let cancels = record_cancels(&bus);
    let service = service();
    let _registration = service.register(actions(), &bus, RegisterOptions::new());
    let listener: Arc<dyn EventListener> = bus.clone();

    let mut stream = service
        .call("ticks", CallOptions::new(), &bus)
        .invoke(Vec::new())
        .into_stream()
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    assert!(
        service
            .registry()
            .multiplexer()
            .stats(&listener, "svc")
            .is_some()
    );

    drop(stream);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(service.registry().multiplexer().listener_count(), 0);
    assert!(cancels.lock().is_empty());
    assert_eq!(service.registry().call_metrics().total_cancelled(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deregister_aborts_running_invocations() {
    let bus = EventBus::shared();
    let service = service();
    let registration = service.register(actions(), &bus, RegisterOptions::new());

    let reply = tokio::spawn(
        service
            .call(
                "slow",
                CallOptions::new().with_timeout(Duration::from_secs(2)),
                &bus,
            )
            .invoke(Vec::new())
            .into_single()
            .unwrap(),
    );
    settle().await;
    assert_eq!(registration.stats().active_invocations, 1);

    registration.deregister();
    assert_eq!(registration.stats().active_invocations, 0);

    // Nobody answers any more.
    let error = reply.await.unwrap().unwrap_err();
    assert!(error.is_timeout());
}

//! Contract Test: Dispatch Loop and Shutdown
//!
//! Constraints verified:
//! - Requests are processed in order, one acknowledgment each
//! - Unmanaged requests produce no acknowledgment
//! - The loop terminates on the shutdown signal
//! - A request in flight when shutdown arrives is still acknowledged
//! - A closed request source ends the loop cleanly

mod common;

use acme_dns_core::traits::ProviderClient;
use acme_dns_core::{ChallengeDispatcher, DispatchEvent, DispatcherConfig};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn add(id: &str, name: &str, domain: &str) -> Vec<u8> {
    payload(json!({
        "id": id,
        "action": "add",
        "domain": domain,
        "name": name,
        "value": format!("tok-{}", id),
    }))
}

#[tokio::test]
async fn shutdown_signal_terminates_dispatcher() {
    let provider = Arc::new(InMemoryProvider::new());
    let (dispatcher, _events) = ChallengeDispatcher::new(
        provider as Arc<dyn ProviderClient>,
        DispatcherConfig::default(),
    )
    .expect("dispatcher construction succeeds");

    let (source, _request_tx) = ControlledRequestSource::new();
    let sink = RecordingSink::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move {
        dispatcher
            .run_with_shutdown(&source, &sink, Some(shutdown_rx))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).expect("shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Dispatcher should terminate within 5 seconds");
    assert!(result.unwrap().unwrap().is_ok());
}

#[tokio::test]
async fn processes_requests_in_order() {
    let provider = Arc::new(InMemoryProvider::new().with_zone("example.com"));
    let (dispatcher, _events) = ChallengeDispatcher::new(
        provider.clone() as Arc<dyn ProviderClient>,
        DispatcherConfig::default().with_managed_domains(["example.com"]),
    )
    .unwrap();

    let (source, request_tx) = ControlledRequestSource::new();
    let sink = RecordingSink::new();
    let sink_handle = sink.clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move {
        dispatcher
            .run_with_shutdown(&source, &sink, Some(shutdown_rx))
            .await
    });

    request_tx
        .send(add("a", "_acme-challenge.a.example.com", "a.example.com"))
        .unwrap();
    request_tx
        .send(add("skip", "_acme-challenge.other.net", "other.net"))
        .unwrap();
    request_tx
        .send(add("b", "_acme-challenge.b.example.com", "b.example.com"))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    let ids: Vec<_> = sink_handle
        .acks()
        .into_iter()
        .map(|ack| ack.id.unwrap())
        .collect();
    assert_eq!(ids, vec![json!("a"), json!("b")]);
    assert_eq!(provider.create_call_count(), 2);
}

#[tokio::test]
async fn in_flight_request_completes_before_exit() {
    let provider = Arc::new(
        InMemoryProvider::new()
            .with_zone("example.com")
            .with_create_delay(Duration::from_millis(200)),
    );
    let (dispatcher, _events) = ChallengeDispatcher::new(
        provider.clone() as Arc<dyn ProviderClient>,
        DispatcherConfig::default(),
    )
    .unwrap();

    let (source, request_tx) = ControlledRequestSource::new();
    let sink = RecordingSink::new();
    let sink_handle = sink.clone();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = tokio::spawn(async move {
        dispatcher
            .run_with_shutdown(&source, &sink, Some(shutdown_rx))
            .await
    });

    request_tx
        .send(add("slow", "_acme-challenge.example.com", "example.com"))
        .unwrap();

    // Signal shutdown while the create call is still sleeping
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.create_call_count(), 1);
    shutdown_tx.send(()).unwrap();

    // Queued after the signal: must not be picked up
    request_tx
        .send(add("late", "_acme-challenge.example.com", "example.com"))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher stops")
        .unwrap()
        .unwrap();

    let acks = sink_handle.acks();
    assert_eq!(acks.len(), 1, "in-flight request acknowledged, nothing after");
    assert_eq!(acks[0].id, Some(json!("slow")));
    assert!(acks[0].is_ok());
}

#[tokio::test]
async fn closed_source_ends_loop() {
    let provider = Arc::new(InMemoryProvider::new().with_zone("example.com"));
    let (dispatcher, mut events) = ChallengeDispatcher::new(
        provider as Arc<dyn ProviderClient>,
        DispatcherConfig::default(),
    )
    .unwrap();

    let (source, request_tx) = ControlledRequestSource::new();
    let sink = RecordingSink::new();
    let sink_handle = sink.clone();

    request_tx
        .send(add("only", "_acme-challenge.example.com", "example.com"))
        .unwrap();
    drop(request_tx);

    // Keep the shutdown sender alive so only the source can end the loop
    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.run_with_shutdown(&source, &sink, Some(shutdown_rx)),
    )
    .await
    .expect("loop ends when the source closes")
    .unwrap();

    assert_eq!(sink_handle.acks().len(), 1);

    let mut stopped = None;
    while let Ok(event) = events.try_recv() {
        if let DispatchEvent::Stopped { reason } = event {
            stopped = Some(reason);
        }
    }
    assert_eq!(stopped.as_deref(), Some("Request source closed"));
}

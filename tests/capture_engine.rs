mod common;

use common::{
    charge_in_status, registry_with, store_with_accounts, CaptureBehavior, ScriptedGateway,
    SANDBOX_ACCOUNT, WORLDPAY_ACCOUNT,
};
use payments_connector::domain::account::PaymentProvider;
use payments_connector::domain::charge::ChargeStatus;
use payments_connector::service::capture_engine::CaptureEngine;
use payments_connector::store::ConnectorStore;
use std::sync::Arc;

fn engine(
    store: Arc<payments_connector::store::memory::MemoryStore>,
    gateway: Arc<ScriptedGateway>,
    max_retries: i64,
) -> CaptureEngine {
    CaptureEngine {
        store,
        gateways: registry_with(vec![gateway]),
        poll_interval: std::time::Duration::from_millis(10),
        batch_size: 100,
        worker_count: 2,
        max_retries,
        retry_delay: chrono::Duration::zero(),
    }
}

#[tokio::test]
async fn synchronous_capture_lands_directly_on_captured() {
    let store = store_with_accounts().await;
    let gateway = Arc::new(ScriptedGateway::new(
        PaymentProvider::Sandbox,
        CaptureBehavior::CapturedNow,
    ));
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway), 3);

    let charge = charge_in_status(
        store.as_ref(),
        SANDBOX_ACCOUNT,
        ChargeStatus::CaptureApproved,
        Some("sandbox-txn-1"),
    )
    .await;

    engine.process_charge(charge.id).await.unwrap();

    let captured = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(captured.status, ChargeStatus::Captured);
    assert_eq!(gateway.capture_call_count(), 1);

    let events: Vec<ChargeStatus> = store
        .charge_events(charge.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(events, vec![ChargeStatus::CaptureReady, ChargeStatus::Captured]);
}

#[tokio::test]
async fn asynchronous_capture_waits_in_capture_submitted() {
    let store = store_with_accounts().await;
    let gateway = Arc::new(ScriptedGateway::new(
        PaymentProvider::Worldpay,
        CaptureBehavior::AcceptedPending,
    ));
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway), 3);

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        Some("wp-order-1"),
    )
    .await;

    engine.process_charge(charge.id).await.unwrap();

    let submitted = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(submitted.status, ChargeStatus::CaptureSubmitted);
    assert_eq!(gateway.capture_call_count(), 1);
}

#[tokio::test]
async fn retryable_failures_stop_at_the_retry_bound() {
    let store = store_with_accounts().await;
    let gateway = Arc::new(ScriptedGateway::new(
        PaymentProvider::Worldpay,
        CaptureBehavior::FailRetryable,
    ));
    let max_retries = 3;
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway), max_retries);

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        Some("wp-order-2"),
    )
    .await;

    // Drive the poll loop by hand until nothing is eligible any more.
    for _ in 0..max_retries {
        engine.tick_once().await.unwrap();
    }
    assert_eq!(engine.tick_once().await.unwrap(), 0, "no further attempts after the bound");

    let failed = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(failed.status, ChargeStatus::CaptureError);
    assert_eq!(
        gateway.capture_call_count(),
        max_retries as u64,
        "the gateway must be hit exactly max_retries times"
    );
    assert_eq!(
        store
            .count_charge_events(charge.id, ChargeStatus::CaptureApprovedRetry)
            .await
            .unwrap(),
        max_retries - 1
    );
}

#[tokio::test]
async fn terminal_gateway_rejection_is_never_retried() {
    let store = store_with_accounts().await;
    let gateway = Arc::new(ScriptedGateway::new(
        PaymentProvider::Worldpay,
        CaptureBehavior::FailTerminal,
    ));
    let engine = engine(Arc::clone(&store), Arc::clone(&gateway), 10);

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        Some("wp-order-3"),
    )
    .await;

    engine.process_charge(charge.id).await.unwrap();
    assert_eq!(engine.tick_once().await.unwrap(), 0);

    let failed = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(failed.status, ChargeStatus::CaptureError);
    assert_eq!(gateway.capture_call_count(), 1);
}

#[tokio::test]
async fn concurrent_engine_instances_submit_capture_once() {
    let store = store_with_accounts().await;
    let gateway = Arc::new(ScriptedGateway::new(
        PaymentProvider::Worldpay,
        CaptureBehavior::AcceptedPending,
    ));

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        Some("wp-order-4"),
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine(Arc::clone(&store), Arc::clone(&gateway), 3);
        handles.push(tokio::spawn(async move {
            engine.process_charge(charge.id).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(
        gateway.capture_call_count(),
        1,
        "losing claimants must never reach the gateway"
    );
    let submitted = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(submitted.status, ChargeStatus::CaptureSubmitted);
}

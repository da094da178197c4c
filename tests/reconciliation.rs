mod common;

use common::{
    charge_in_status, refund_in_status, store_with_accounts, EPDQ_ACCOUNT, SMARTPAY_ACCOUNT,
    WORLDPAY_ACCOUNT,
};
use chrono::Utc;
use payments_connector::domain::account::PaymentProvider;
use payments_connector::domain::charge::ChargeStatus;
use payments_connector::domain::notification::InboundNotification;
use payments_connector::domain::refund::RefundStatus;
use payments_connector::service::notification_service::{NotificationService, ReconcileOutcome};
use payments_connector::service::reference_matcher;
use payments_connector::store::ConnectorStore;
use std::sync::Arc;

fn notification(reference: &str, code: &str) -> InboundNotification {
    InboundNotification {
        reference: reference.to_string(),
        status_code: code.to_string(),
        event_time: Some(Utc::now()),
    }
}

#[tokio::test]
async fn capture_confirmation_applies_and_stores_gateway_event_time() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureSubmitted,
        Some("wp-order-9"),
    )
    .await;

    let event_time = Utc::now();
    let outcome = service
        .reconcile(
            PaymentProvider::Worldpay,
            InboundNotification {
                reference: "wp-order-9".to_string(),
                status_code: "CAPTURED".to_string(),
                event_time: Some(event_time),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Applied);
    let captured = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(captured.status, ChargeStatus::Captured);

    let events = store.charge_events(charge.id).await.unwrap();
    let capture_event = events.iter().find(|e| e.status == ChargeStatus::Captured).unwrap();
    assert_eq!(capture_event.gateway_event_time, Some(event_time));
}

#[tokio::test]
async fn redelivered_notification_is_discarded_as_duplicate() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureSubmitted,
        Some("wp-order-10"),
    )
    .await;

    let first = service
        .reconcile(PaymentProvider::Worldpay, notification("wp-order-10", "CAPTURED"))
        .await
        .unwrap();
    assert_eq!(first, ReconcileOutcome::Applied);

    let second = service
        .reconcile(PaymentProvider::Worldpay, notification("wp-order-10", "CAPTURED"))
        .await
        .unwrap();
    assert_eq!(second, ReconcileOutcome::Duplicate);

    let events = store.charge_events(charge.id).await.unwrap();
    assert_eq!(
        events.iter().filter(|e| e.status == ChargeStatus::Captured).count(),
        1
    );
}

#[tokio::test]
async fn stale_authorised_notification_never_unwinds_a_terminal_state() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::Captured,
        Some("wp-order-11"),
    )
    .await;

    let outcome = service
        .reconcile(PaymentProvider::Worldpay, notification("wp-order-11", "AUTHORISED"))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::IllegalTransition);
    let unchanged = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, ChargeStatus::Captured);
    assert!(store.charge_events(charge.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_status_code_is_logged_and_discarded() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureSubmitted,
        Some("wp-order-12"),
    )
    .await;

    let outcome = service
        .reconcile(PaymentProvider::Worldpay, notification("wp-order-12", "SOMETHING_NEW"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::UnknownStatusCode);
}

#[tokio::test]
async fn unmatched_reference_is_not_an_error() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let outcome = service
        .reconcile(PaymentProvider::Worldpay, notification("never-seen", "CAPTURED"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Unmatched);
}

#[tokio::test]
async fn epdq_composite_reference_resolves_by_pay_id() {
    let store = store_with_accounts().await;

    let charge = charge_in_status(
        store.as_ref(),
        EPDQ_ACCOUNT,
        ChargeStatus::CaptureSubmitted,
        Some("3014644340"),
    )
    .await;

    let resolved =
        reference_matcher::resolve_charge(store.as_ref(), PaymentProvider::Epdq, "3014644340/2")
            .await
            .unwrap()
            .expect("composite reference should match the charge");
    assert_eq!(resolved.id, charge.id);

    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };
    let outcome = service
        .reconcile(PaymentProvider::Epdq, notification("3014644340/2", "9"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);
    let captured = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(captured.status, ChargeStatus::Captured);
}

#[tokio::test]
async fn smartpay_refund_notification_matches_the_refunds_own_psp_reference() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let charge = charge_in_status(
        store.as_ref(),
        SMARTPAY_ACCOUNT,
        ChargeStatus::Captured,
        Some("psp-auth-100"),
    )
    .await;
    let refund = refund_in_status(
        store.as_ref(),
        &charge,
        RefundStatus::RefundSubmitted,
        Some("psp-refund-200"),
    )
    .await;

    let event_time = Utc::now();
    let outcome = service
        .reconcile(
            PaymentProvider::Smartpay,
            InboundNotification {
                reference: "psp-refund-200".to_string(),
                status_code: "REFUND".to_string(),
                event_time: Some(event_time),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let refunded = store.find_refund_by_id(refund.id).await.unwrap().unwrap();
    assert_eq!(refunded.status, RefundStatus::Refunded);

    let events = store.refund_events(refund.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, RefundStatus::Refunded);
    assert_eq!(events[0].gateway_event_time, Some(event_time));
}

#[tokio::test]
async fn worldpay_reference_round_trips_through_the_matcher() {
    let store = store_with_accounts().await;
    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::AuthorisationSuccess,
        Some("wp-order-13"),
    )
    .await;

    let resolved =
        reference_matcher::resolve_charge(store.as_ref(), PaymentProvider::Worldpay, "wp-order-13")
            .await
            .unwrap()
            .unwrap();
    assert_eq!(resolved.id, charge.id);

    // The same reference under a different provider must not match.
    let cross_provider =
        reference_matcher::resolve_charge(store.as_ref(), PaymentProvider::Smartpay, "wp-order-13")
            .await
            .unwrap();
    assert!(cross_provider.is_none());
}

#[tokio::test]
async fn refund_error_notification_terminates_the_refund() {
    let store = store_with_accounts().await;
    let service = NotificationService { store: Arc::clone(&store) as Arc<dyn ConnectorStore> };

    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::Captured,
        Some("wp-order-14"),
    )
    .await;
    let refund = refund_in_status(
        store.as_ref(),
        &charge,
        RefundStatus::RefundSubmitted,
        Some("wp-refund-14"),
    )
    .await;

    let outcome = service
        .reconcile(PaymentProvider::Worldpay, notification("wp-refund-14", "REFUND_FAILED"))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Applied);

    let errored = store.find_refund_by_id(refund.id).await.unwrap().unwrap();
    assert_eq!(errored.status, RefundStatus::RefundError);
}

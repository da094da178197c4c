mod common;

use common::{charge_in_status, store_with_accounts, SANDBOX_ACCOUNT, WORLDPAY_ACCOUNT};
use payments_connector::domain::account::GatewayVariant;
use payments_connector::domain::charge::ChargeStatus;
use payments_connector::service::transitioner::transition_charge;
use payments_connector::store::ConnectorStore;
use std::sync::Arc;

#[tokio::test]
async fn replay_of_the_same_transition_is_a_no_op() {
    let store = store_with_accounts().await;
    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        None,
    )
    .await;

    let expected = [ChargeStatus::CaptureApproved, ChargeStatus::CaptureApprovedRetry];
    let first = transition_charge(
        store.as_ref(),
        GatewayVariant::Asynchronous,
        charge.id,
        &expected,
        ChargeStatus::CaptureReady,
        None,
    )
    .await
    .unwrap();
    assert!(first);

    let second = transition_charge(
        store.as_ref(),
        GatewayVariant::Asynchronous,
        charge.id,
        &expected,
        ChargeStatus::CaptureReady,
        None,
    )
    .await
    .unwrap();
    assert!(!second);

    let events = store.charge_events(charge.id).await.unwrap();
    let ready_events: Vec<_> = events
        .iter()
        .filter(|e| e.status == ChargeStatus::CaptureReady)
        .collect();
    assert_eq!(ready_events.len(), 1, "replay must not append a second event");
}

#[tokio::test]
async fn lost_race_reports_no_rows_and_no_error() {
    let store = store_with_accounts().await;
    let charge = charge_in_status(
        store.as_ref(),
        SANDBOX_ACCOUNT,
        ChargeStatus::AuthorisationSuccess,
        None,
    )
    .await;

    // Another actor has already moved the charge on.
    let outcome = store
        .transition_charge_status(
            charge.id,
            &[ChargeStatus::Created, ChargeStatus::EnteringCardDetails],
            ChargeStatus::SystemCancelled,
        )
        .await
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.rows_affected, 0);
    let unchanged = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, ChargeStatus::AuthorisationSuccess);
}

#[tokio::test]
async fn exactly_one_of_many_concurrent_claimants_wins() {
    let store = store_with_accounts().await;
    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::CaptureApproved,
        None,
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .transition_charge_status(
                    charge.id,
                    &[ChargeStatus::CaptureApproved, ChargeStatus::CaptureApprovedRetry],
                    ChargeStatus::CaptureReady,
                )
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().applied {
            winners += 1;
        }
    }

    assert_eq!(winners, 1, "the claim must be granted to exactly one caller");
    let claimed = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    assert_eq!(claimed.status, ChargeStatus::CaptureReady);
}

#[tokio::test]
async fn cancel_and_authorisation_race_has_exactly_one_winner() {
    let store = store_with_accounts().await;
    let charge = charge_in_status(
        store.as_ref(),
        WORLDPAY_ACCOUNT,
        ChargeStatus::AuthorisationReady,
        None,
    )
    .await;

    let cancel_store = Arc::clone(&store);
    let cancel = tokio::spawn(async move {
        transition_charge(
            cancel_store.as_ref(),
            GatewayVariant::Asynchronous,
            charge.id,
            &[ChargeStatus::AuthorisationReady],
            ChargeStatus::AuthorisationCancelled,
            None,
        )
        .await
        .unwrap()
    });

    let success_store = Arc::clone(&store);
    let success = tokio::spawn(async move {
        let origins = payments_connector::transitions::validator::legal_origins(
            GatewayVariant::Asynchronous,
            ChargeStatus::AuthorisationSuccess,
        );
        transition_charge(
            success_store.as_ref(),
            GatewayVariant::Asynchronous,
            charge.id,
            &origins,
            ChargeStatus::AuthorisationSuccess,
            None,
        )
        .await
        .unwrap()
    });

    let cancel_won = cancel.await.unwrap();
    let success_won = success.await.unwrap();
    assert!(cancel_won ^ success_won, "exactly one actor must win the race");

    let settled = store.find_charge_by_id(charge.id).await.unwrap().unwrap();
    let expected = if cancel_won {
        ChargeStatus::AuthorisationCancelled
    } else {
        ChargeStatus::AuthorisationSuccess
    };
    assert_eq!(settled.status, expected);

    let events = store.charge_events(charge.id).await.unwrap();
    assert_eq!(events.len(), 1, "the loser must leave no partial state behind");
    assert_eq!(events[0].status, expected);
}

use crate::domain::account::GatewayVariant;
use crate::domain::charge::ChargeStatus;
use crate::domain::refund::RefundStatus;
use crate::store::ConnectorStore;
use crate::transitions::validator;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

/// Validate-then-write-then-record, the one shape every status change takes.
/// Returns false when the conditional update lost a race; the event log is
/// only touched for applied transitions, keeping it agreed with current
/// state.
pub async fn transition_charge(
    store: &dyn ConnectorStore,
    variant: GatewayVariant,
    charge_id: i64,
    expected: &[ChargeStatus],
    to: ChargeStatus,
    gateway_event_time: Option<DateTime<Utc>>,
) -> Result<bool> {
    let legal: Vec<ChargeStatus> = expected
        .iter()
        .copied()
        .filter(|from| validator::charge_transition_allowed(variant, *from, to))
        .collect();
    if legal.is_empty() {
        bail!(
            "no legal transition to {} from any of the expected statuses",
            to
        );
    }

    let outcome = store.transition_charge_status(charge_id, &legal, to).await?;
    if outcome.applied {
        store.record_charge_event(charge_id, to, gateway_event_time).await?;
    }
    Ok(outcome.applied)
}

pub async fn transition_refund(
    store: &dyn ConnectorStore,
    refund_id: i64,
    expected: &[RefundStatus],
    to: RefundStatus,
    gateway_event_time: Option<DateTime<Utc>>,
) -> Result<bool> {
    let legal: Vec<RefundStatus> = expected
        .iter()
        .copied()
        .filter(|from| validator::refund_transition_allowed(*from, to))
        .collect();
    if legal.is_empty() {
        bail!(
            "no legal refund transition to {} from any of the expected statuses",
            to
        );
    }

    let outcome = store.transition_refund_status(refund_id, &legal, to).await?;
    if outcome.applied {
        store.record_refund_event(refund_id, to, gateway_event_time).await?;
    }
    Ok(outcome.applied)
}

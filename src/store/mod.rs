use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{CardDetailsSnapshot, Charge, ChargeStatus};
use crate::domain::event::{ChargeEvent, RefundEvent};
use crate::domain::refund::{Refund, RefundStatus};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

pub mod memory;
pub mod postgres;

/// Result of a conditional status update. `applied == false` means another
/// actor already moved the record past the expected set: the normal outcome
/// of a race, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub applied: bool,
    pub rows_affected: u64,
}

impl TransitionOutcome {
    pub fn applied(rows: u64) -> Self {
        Self {
            applied: true,
            rows_affected: rows,
        }
    }

    pub fn lost_race() -> Self {
        Self {
            applied: false,
            rows_affected: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCharge {
    pub external_id: String,
    pub gateway_account_id: i64,
    pub amount: i64,
    pub return_url: String,
    pub reference: String,
    pub description: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub external_id: String,
    pub charge_id: i64,
    pub amount: i64,
    pub user_external_id: Option<String>,
}

/// Storage backend for the charge/refund lifecycle. The two status
/// transition methods are the only way any caller writes a status, and both
/// are single atomic compare-against-set updates; every other mutation here
/// is either an insert or touches non-status columns.
///
/// Callers are responsible for checking the transition validator first; the
/// store deliberately knows nothing about the transition tables.
#[async_trait::async_trait]
pub trait ConnectorStore: Send + Sync {
    // charges
    async fn insert_charge(&self, new: NewCharge) -> Result<Charge>;
    async fn find_charge_by_external_id(&self, external_id: &str) -> Result<Option<Charge>>;
    async fn find_charge_by_id(&self, id: i64) -> Result<Option<Charge>>;
    async fn find_charge_by_gateway_transaction_id(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Charge>>;
    async fn transition_charge_status(
        &self,
        charge_id: i64,
        expected: &[ChargeStatus],
        to: ChargeStatus,
    ) -> Result<TransitionOutcome>;
    async fn set_charge_transaction_id(
        &self,
        charge_id: i64,
        transaction_id: &str,
        provider_session_id: Option<&str>,
    ) -> Result<()>;
    async fn set_charge_card_details(
        &self,
        charge_id: i64,
        details: &CardDetailsSnapshot,
    ) -> Result<()>;
    /// Charges the capture engine may claim: freshly approved ones, plus
    /// retry ones whose last retry event is older than `retry_delay`.
    async fn charges_ready_for_capture(
        &self,
        retry_delay: Duration,
        limit: i64,
    ) -> Result<Vec<Charge>>;
    async fn charges_for_expiry(
        &self,
        statuses: &[ChargeStatus],
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Charge>>;

    // charge event log (append-only)
    async fn record_charge_event(
        &self,
        charge_id: i64,
        status: ChargeStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()>;
    async fn charge_events(&self, charge_id: i64) -> Result<Vec<ChargeEvent>>;
    async fn count_charge_events(&self, charge_id: i64, status: ChargeStatus) -> Result<i64>;

    // refunds
    async fn insert_refund(&self, new: NewRefund) -> Result<Refund>;
    async fn find_refund_by_external_id(&self, external_id: &str) -> Result<Option<Refund>>;
    async fn find_refund_by_id(&self, id: i64) -> Result<Option<Refund>>;
    async fn find_refund_by_gateway_reference(
        &self,
        provider: PaymentProvider,
        reference: &str,
    ) -> Result<Option<Refund>>;
    async fn refunds_for_charge(&self, charge_id: i64) -> Result<Vec<Refund>>;
    async fn transition_refund_status(
        &self,
        refund_id: i64,
        expected: &[RefundStatus],
        to: RefundStatus,
    ) -> Result<TransitionOutcome>;
    async fn set_refund_gateway_reference(&self, refund_id: i64, reference: &str) -> Result<()>;
    async fn refunds_ready_for_submission(&self, limit: i64) -> Result<Vec<Refund>>;

    // refund event log (append-only)
    async fn record_refund_event(
        &self,
        refund_id: i64,
        status: RefundStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()>;
    async fn refund_events(&self, refund_id: i64) -> Result<Vec<RefundEvent>>;
    async fn count_refund_events(&self, refund_id: i64, status: RefundStatus) -> Result<i64>;

    // gateway accounts (read-only to the lifecycle core)
    async fn insert_account(&self, account: GatewayAccount) -> Result<()>;
    async fn find_account(&self, id: i64) -> Result<Option<GatewayAccount>>;
}

use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{CardDetailsSnapshot, Charge, ChargeStatus};
use crate::domain::event::{ChargeEvent, RefundEvent};
use crate::domain::refund::{Refund, RefundStatus};
use crate::store::{ConnectorStore, NewCharge, NewRefund, TransitionOutcome};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory store with the same conditional-update semantics as `PgStore`:
/// each status write checks the current status against the expected set and
/// applies atomically under one lock. Backs the integration tests, where it
/// stands in for the database as the single serialization point.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_charge_id: i64,
    next_refund_id: i64,
    next_event_id: i64,
    charges: HashMap<i64, Charge>,
    refunds: HashMap<i64, Refund>,
    charge_events: Vec<ChargeEvent>,
    refund_events: Vec<RefundEvent>,
    accounts: HashMap<i64, GatewayAccount>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_of(inner: &Inner, charge: &Charge) -> Option<PaymentProvider> {
        inner
            .accounts
            .get(&charge.gateway_account_id)
            .map(|a| a.payment_provider)
    }
}

#[async_trait::async_trait]
impl ConnectorStore for MemoryStore {
    async fn insert_charge(&self, new: NewCharge) -> Result<Charge> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_charge_id += 1;
        let charge = Charge {
            id: inner.next_charge_id,
            external_id: new.external_id,
            gateway_account_id: new.gateway_account_id,
            amount: new.amount,
            status: ChargeStatus::Created,
            gateway_transaction_id: None,
            provider_session_id: None,
            return_url: new.return_url,
            reference: new.reference,
            description: new.description,
            email: new.email,
            card_details: None,
            created_date: Utc::now(),
        };
        inner.charges.insert(charge.id, charge.clone());
        Ok(charge)
    }

    async fn find_charge_by_external_id(&self, external_id: &str) -> Result<Option<Charge>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .charges
            .values()
            .find(|c| c.external_id == external_id)
            .cloned())
    }

    async fn find_charge_by_id(&self, id: i64) -> Result<Option<Charge>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.charges.get(&id).cloned())
    }

    async fn find_charge_by_gateway_transaction_id(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> Result<Option<Charge>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .charges
            .values()
            .find(|c| {
                c.gateway_transaction_id.as_deref() == Some(transaction_id)
                    && Self::provider_of(&inner, c) == Some(provider)
            })
            .cloned())
    }

    async fn transition_charge_status(
        &self,
        charge_id: i64,
        expected: &[ChargeStatus],
        to: ChargeStatus,
    ) -> Result<TransitionOutcome> {
        let mut inner = self.inner.lock().unwrap();
        match inner.charges.get_mut(&charge_id) {
            Some(charge) if expected.contains(&charge.status) => {
                charge.status = to;
                Ok(TransitionOutcome::applied(1))
            }
            _ => Ok(TransitionOutcome::lost_race()),
        }
    }

    async fn set_charge_transaction_id(
        &self,
        charge_id: i64,
        transaction_id: &str,
        provider_session_id: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(charge) = inner.charges.get_mut(&charge_id) {
            charge.gateway_transaction_id = Some(transaction_id.to_string());
            if let Some(session) = provider_session_id {
                charge.provider_session_id = Some(session.to_string());
            }
        }
        Ok(())
    }

    async fn set_charge_card_details(
        &self,
        charge_id: i64,
        details: &CardDetailsSnapshot,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(charge) = inner.charges.get_mut(&charge_id) {
            charge.card_details = Some(details.clone());
        }
        Ok(())
    }

    async fn charges_ready_for_capture(
        &self,
        retry_delay: Duration,
        limit: i64,
    ) -> Result<Vec<Charge>> {
        let inner = self.inner.lock().unwrap();
        let retried_before = Utc::now() - retry_delay;
        let mut ready: Vec<Charge> = inner
            .charges
            .values()
            .filter(|c| match c.status {
                ChargeStatus::CaptureApproved => true,
                ChargeStatus::CaptureApprovedRetry => inner
                    .charge_events
                    .iter()
                    .filter(|e| {
                        e.charge_id == c.id && e.status == ChargeStatus::CaptureApprovedRetry
                    })
                    .all(|e| e.updated <= retried_before),
                _ => false,
            })
            .cloned()
            .collect();
        ready.sort_by_key(|c| c.id);
        ready.truncate(limit as usize);
        Ok(ready)
    }

    async fn charges_for_expiry(
        &self,
        statuses: &[ChargeStatus],
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Charge>> {
        let inner = self.inner.lock().unwrap();
        let mut expirable: Vec<Charge> = inner
            .charges
            .values()
            .filter(|c| statuses.contains(&c.status) && c.created_date < created_before)
            .cloned()
            .collect();
        expirable.sort_by_key(|c| c.id);
        expirable.truncate(limit as usize);
        Ok(expirable)
    }

    async fn record_charge_event(
        &self,
        charge_id: i64,
        status: ChargeStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_event_id += 1;
        let event = ChargeEvent {
            id: inner.next_event_id,
            charge_id,
            status,
            gateway_event_time,
            updated: Utc::now(),
        };
        inner.charge_events.push(event);
        Ok(())
    }

    async fn charge_events(&self, charge_id: i64) -> Result<Vec<ChargeEvent>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .charge_events
            .iter()
            .filter(|e| e.charge_id == charge_id)
            .cloned()
            .collect())
    }

    async fn count_charge_events(&self, charge_id: i64, status: ChargeStatus) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .charge_events
            .iter()
            .filter(|e| e.charge_id == charge_id && e.status == status)
            .count() as i64)
    }

    async fn insert_refund(&self, new: NewRefund) -> Result<Refund> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_refund_id += 1;
        let refund = Refund {
            id: inner.next_refund_id,
            external_id: new.external_id,
            charge_id: new.charge_id,
            amount: new.amount,
            status: RefundStatus::Created,
            gateway_transaction_id: None,
            user_external_id: new.user_external_id,
            created_date: Utc::now(),
        };
        inner.refunds.insert(refund.id, refund.clone());
        Ok(refund)
    }

    async fn find_refund_by_external_id(&self, external_id: &str) -> Result<Option<Refund>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .refunds
            .values()
            .find(|r| r.external_id == external_id)
            .cloned())
    }

    async fn find_refund_by_id(&self, id: i64) -> Result<Option<Refund>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.refunds.get(&id).cloned())
    }

    async fn find_refund_by_gateway_reference(
        &self,
        provider: PaymentProvider,
        reference: &str,
    ) -> Result<Option<Refund>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .refunds
            .values()
            .find(|r| {
                r.gateway_transaction_id.as_deref() == Some(reference)
                    && inner
                        .charges
                        .get(&r.charge_id)
                        .and_then(|c| Self::provider_of(&inner, c))
                        == Some(provider)
            })
            .cloned())
    }

    async fn refunds_for_charge(&self, charge_id: i64) -> Result<Vec<Refund>> {
        let inner = self.inner.lock().unwrap();
        let mut refunds: Vec<Refund> = inner
            .refunds
            .values()
            .filter(|r| r.charge_id == charge_id)
            .cloned()
            .collect();
        refunds.sort_by_key(|r| r.id);
        Ok(refunds)
    }

    async fn transition_refund_status(
        &self,
        refund_id: i64,
        expected: &[RefundStatus],
        to: RefundStatus,
    ) -> Result<TransitionOutcome> {
        let mut inner = self.inner.lock().unwrap();
        match inner.refunds.get_mut(&refund_id) {
            Some(refund) if expected.contains(&refund.status) => {
                refund.status = to;
                Ok(TransitionOutcome::applied(1))
            }
            _ => Ok(TransitionOutcome::lost_race()),
        }
    }

    async fn set_refund_gateway_reference(&self, refund_id: i64, reference: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(refund) = inner.refunds.get_mut(&refund_id) {
            refund.gateway_transaction_id = Some(reference.to_string());
        }
        Ok(())
    }

    async fn refunds_ready_for_submission(&self, limit: i64) -> Result<Vec<Refund>> {
        let inner = self.inner.lock().unwrap();
        let mut ready: Vec<Refund> = inner
            .refunds
            .values()
            .filter(|r| r.status == RefundStatus::Created)
            .cloned()
            .collect();
        ready.sort_by_key(|r| r.id);
        ready.truncate(limit as usize);
        Ok(ready)
    }

    async fn record_refund_event(
        &self,
        refund_id: i64,
        status: RefundStatus,
        gateway_event_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_event_id += 1;
        let event = RefundEvent {
            id: inner.next_event_id,
            refund_id,
            status,
            gateway_event_time,
            updated: Utc::now(),
        };
        inner.refund_events.push(event);
        Ok(())
    }

    async fn refund_events(&self, refund_id: i64) -> Result<Vec<RefundEvent>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .refund_events
            .iter()
            .filter(|e| e.refund_id == refund_id)
            .cloned()
            .collect())
    }

    async fn count_refund_events(&self, refund_id: i64, status: RefundStatus) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .refund_events
            .iter()
            .filter(|e| e.refund_id == refund_id && e.status == status)
            .count() as i64)
    }

    async fn insert_account(&self, account: GatewayAccount) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.accounts.insert(account.id, account);
        Ok(())
    }

    async fn find_account(&self, id: i64) -> Result<Option<GatewayAccount>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.get(&id).cloned())
    }
}

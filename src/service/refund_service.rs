use crate::domain::charge::ChargeStatus;
use crate::domain::error::ConnectorError;
use crate::domain::refund::{CreateRefundRequest, Refund, RefundStatus};
use crate::service::transitioner::transition_refund;
use crate::store::{ConnectorStore, NewRefund};
use crate::transitions::validator;
use std::sync::Arc;
use uuid::Uuid;

/// Refund creation and lookup for the API layer. A refund row only comes
/// into existence against a captured charge with enough unrefunded amount
/// left; the background engine does the submission.
#[derive(Clone)]
pub struct RefundService {
    pub store: Arc<dyn ConnectorStore>,
}

impl RefundService {
    pub async fn create_refund(
        &self,
        charge_external_id: &str,
        req: CreateRefundRequest,
    ) -> Result<Refund, ConnectorError> {
        if req.amount <= 0 {
            return Err(ConnectorError::Invalid("amount must be greater than zero".to_string()));
        }

        let charge = self
            .store
            .find_charge_by_external_id(charge_external_id)
            .await?
            .ok_or_else(|| ConnectorError::ChargeNotFound(charge_external_id.to_string()))?;

        if charge.status != ChargeStatus::Captured {
            return Err(ConnectorError::Invalid(format!(
                "charge in status {} is not refundable",
                charge.status
            )));
        }

        let already_refunded: i64 = self
            .store
            .refunds_for_charge(charge.id)
            .await?
            .iter()
            .filter(|r| r.status != RefundStatus::RefundError)
            .map(|r| r.amount)
            .sum();
        if already_refunded + req.amount > charge.amount {
            return Err(ConnectorError::Invalid(format!(
                "refund of {} exceeds remaining refundable amount {}",
                req.amount,
                charge.amount - already_refunded
            )));
        }

        let refund = self
            .store
            .insert_refund(NewRefund {
                external_id: Uuid::new_v4().simple().to_string(),
                charge_id: charge.id,
                amount: req.amount,
                user_external_id: req.user_external_id,
            })
            .await?;

        tracing::info!(
            refund = %refund.external_id,
            charge = %charge.external_id,
            amount = refund.amount,
            "refund created"
        );
        Ok(refund)
    }

    /// Direct status change requested by the API layer, gated on the
    /// refund's current status so a concurrent move surfaces as a conflict.
    pub async fn transition_refund_status(
        &self,
        external_id: &str,
        to: RefundStatus,
    ) -> Result<Refund, ConnectorError> {
        let refund = self.find_refund(external_id).await?;

        if !validator::refund_transition_allowed(refund.status, to) {
            return Err(ConnectorError::IllegalTransition {
                from: refund.status.to_string(),
                to: to.to_string(),
            });
        }

        let applied =
            transition_refund(self.store.as_ref(), refund.id, &[refund.status], to, None).await?;
        if !applied {
            return Err(ConnectorError::Conflict);
        }

        self.find_refund(external_id).await
    }

    pub async fn find_refund(&self, external_id: &str) -> Result<Refund, ConnectorError> {
        self.store
            .find_refund_by_external_id(external_id)
            .await?
            .ok_or_else(|| ConnectorError::RefundNotFound(external_id.to_string()))
    }

    pub async fn refunds_for_charge(
        &self,
        charge_external_id: &str,
    ) -> Result<Vec<Refund>, ConnectorError> {
        let charge = self
            .store
            .find_charge_by_external_id(charge_external_id)
            .await?
            .ok_or_else(|| ConnectorError::ChargeNotFound(charge_external_id.to_string()))?;
        Ok(self.store.refunds_for_charge(charge.id).await?)
    }
}

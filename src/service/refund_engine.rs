use crate::domain::refund::RefundStatus;
use crate::gateways::{GatewayError, GatewayRegistry, RefundSubmitStatus};
use crate::service::transitioner::transition_refund;
use crate::store::ConnectorStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Background refund submitter. The `CREATED -> REFUND_SUBMITTED` claim is
/// the exclusivity gate; the refund status set has no retry state, so a
/// failed submission resolves terminally to `REFUND_ERROR`.
#[derive(Clone)]
pub struct RefundEngine {
    pub store: Arc<dyn ConnectorStore>,
    pub gateways: GatewayRegistry,
    pub poll_interval: std::time::Duration,
    pub batch_size: i64,
}

impl RefundEngine {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick_once().await {
                tracing::error!(error = %err, "refund tick failed");
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn tick_once(&self) -> Result<usize> {
        let ready = self.store.refunds_ready_for_submission(self.batch_size).await?;
        let mut processed = 0;
        for refund in ready {
            if let Err(err) = self.process_refund(refund.id).await {
                tracing::error!(refund_id = refund.id, error = %err, "refund submission failed");
            }
            processed += 1;
        }
        Ok(processed)
    }

    pub async fn process_refund(&self, refund_id: i64) -> Result<()> {
        let refund = self
            .store
            .find_refund_by_id(refund_id)
            .await?
            .ok_or_else(|| anyhow!("refund {} disappeared", refund_id))?;
        let charge = self
            .store
            .find_charge_by_id(refund.charge_id)
            .await?
            .ok_or_else(|| anyhow!("charge {} disappeared", refund.charge_id))?;
        let account = self
            .store
            .find_account(charge.gateway_account_id)
            .await?
            .ok_or_else(|| anyhow!("gateway account {} not found", charge.gateway_account_id))?;

        let claimed = transition_refund(
            self.store.as_ref(),
            refund.id,
            &[RefundStatus::Created],
            RefundStatus::RefundSubmitted,
            None,
        )
        .await?;
        if !claimed {
            return Ok(());
        }

        let client = self.gateways.client_for(account.payment_provider)?;
        match client.refund(&account, &charge, &refund).await {
            Ok(response) => {
                if let Some(reference) = response.reference.as_deref() {
                    self.store.set_refund_gateway_reference(refund.id, reference).await?;
                }
                if response.status == RefundSubmitStatus::Refunded {
                    transition_refund(
                        self.store.as_ref(),
                        refund.id,
                        &[RefundStatus::RefundSubmitted],
                        RefundStatus::Refunded,
                        None,
                    )
                    .await?;
                }
                // Pending refunds stay REFUND_SUBMITTED until the provider's
                // notification confirms them.
            }
            Err(GatewayError::Retryable(reason)) | Err(GatewayError::Terminal(reason)) => {
                tracing::error!(refund = %refund.external_id, reason, "gateway refund failed");
                transition_refund(
                    self.store.as_ref(),
                    refund.id,
                    &[RefundStatus::RefundSubmitted],
                    RefundStatus::RefundError,
                    None,
                )
                .await?;
            }
        }
        Ok(())
    }
}

use crate::domain::charge::ChargeStatus;
use crate::gateways::{CaptureStatus, GatewayError, GatewayRegistry};
use crate::service::transitioner::transition_charge;
use crate::store::ConnectorStore;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Background capture processor: a poller feeds approved charge ids into a
/// channel drained by a pool of workers. The `CAPTURE_READY` claim is the
/// only coordination point, so any number of engine instances (or overlapping
/// deployments) can run against the same database without double-submitting.
#[derive(Clone)]
pub struct CaptureEngine {
    pub store: Arc<dyn ConnectorStore>,
    pub gateways: GatewayRegistry,
    pub poll_interval: std::time::Duration,
    pub batch_size: i64,
    pub worker_count: usize,
    pub max_retries: i64,
    pub retry_delay: chrono::Duration,
}

impl CaptureEngine {
    pub async fn run(self) {
        let (tx, rx) = mpsc::channel::<i64>(self.batch_size.max(1) as usize);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        for _ in 0..self.worker_count.max(1) {
            let engine = self.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let charge_id = { rx.lock().await.recv().await };
                    let Some(charge_id) = charge_id else { break };
                    if let Err(err) = engine.process_charge(charge_id).await {
                        tracing::error!(charge_id, error = %err, "capture attempt failed");
                    }
                }
            });
        }

        loop {
            match self
                .store
                .charges_ready_for_capture(self.retry_delay, self.batch_size)
                .await
            {
                Ok(ready) => {
                    for charge in ready {
                        // A charge polled twice before a worker claims it is
                        // harmless: the second claim loses and no-ops.
                        if tx.send(charge.id).await.is_err() {
                            return;
                        }
                    }
                }
                Err(err) => tracing::error!(error = %err, "capture poll failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One capture attempt for one charge. Claims exclusivity first; every
    /// outcome (submitted, captured, bounded retry, terminal error) resolves
    /// the claim so the charge never sticks in `CAPTURE_READY`.
    pub async fn process_charge(&self, charge_id: i64) -> Result<()> {
        let charge = self
            .store
            .find_charge_by_id(charge_id)
            .await?
            .ok_or_else(|| anyhow!("charge {} disappeared", charge_id))?;
        let account = self
            .store
            .find_account(charge.gateway_account_id)
            .await?
            .ok_or_else(|| anyhow!("gateway account {} not found", charge.gateway_account_id))?;
        let variant = account.payment_provider.variant();

        let claimed = transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::CaptureApproved, ChargeStatus::CaptureApprovedRetry],
            ChargeStatus::CaptureReady,
            None,
        )
        .await?;
        if !claimed {
            return Ok(());
        }

        let client = self.gateways.client_for(account.payment_provider)?;
        let target = match client.capture(&account, &charge).await {
            Ok(response) => match response.status {
                CaptureStatus::Captured => ChargeStatus::Captured,
                CaptureStatus::Pending => ChargeStatus::CaptureSubmitted,
            },
            Err(GatewayError::Retryable(reason)) => {
                let retries_spent = self
                    .store
                    .count_charge_events(charge.id, ChargeStatus::CaptureApprovedRetry)
                    .await?;
                if retries_spent + 1 >= self.max_retries {
                    tracing::error!(
                        charge = %charge.external_id,
                        attempts = retries_spent + 1,
                        reason,
                        "capture retries exhausted"
                    );
                    ChargeStatus::CaptureError
                } else {
                    tracing::warn!(charge = %charge.external_id, reason, "capture failed, will retry");
                    ChargeStatus::CaptureApprovedRetry
                }
            }
            Err(GatewayError::Terminal(reason)) => {
                tracing::error!(charge = %charge.external_id, reason, "capture rejected by gateway");
                ChargeStatus::CaptureError
            }
        };

        transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::CaptureReady],
            target,
            None,
        )
        .await?;
        Ok(())
    }

    /// Drives every currently-eligible charge once. The poller loop does the
    /// same through the worker pool; this synchronous form exists for the
    /// manual task endpoint.
    pub async fn tick_once(&self) -> Result<usize> {
        let ready = self
            .store
            .charges_ready_for_capture(self.retry_delay, self.batch_size)
            .await?;
        let mut processed = 0;
        for charge in ready {
            self.process_charge(charge.id).await?;
            processed += 1;
        }
        Ok(processed)
    }
}

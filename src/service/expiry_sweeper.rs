use crate::domain::charge::ChargeStatus;
use crate::gateways::{GatewayError, GatewayRegistry};
use crate::service::transitioner::transition_charge;
use crate::store::ConnectorStore;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;

/// Sweeps charges abandoned in a non-terminal pre-capture state past the
/// expiry window. Charges the gateway never authorised expire in one hop;
/// authorised ones follow the claim-then-cancel-then-resolve shape so the
/// provider releases the funds.
#[derive(Clone)]
pub struct ExpirySweeper {
    pub store: Arc<dyn ConnectorStore>,
    pub gateways: GatewayRegistry,
    pub sweep_interval: std::time::Duration,
    pub expiry_window: chrono::Duration,
    pub batch_size: i64,
}

const DIRECT_EXPIRABLE: [ChargeStatus; 3] = [
    ChargeStatus::Created,
    ChargeStatus::EnteringCardDetails,
    ChargeStatus::Authorisation3dsRequired,
];

impl ExpirySweeper {
    pub async fn run(self) {
        loop {
            match self.tick_once().await {
                Ok(expired) if expired > 0 => {
                    tracing::info!(expired, "expiry sweep completed");
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "expiry sweep failed"),
            }
            tokio::time::sleep(self.sweep_interval).await;
        }
    }

    pub async fn tick_once(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.expiry_window;
        let mut statuses = DIRECT_EXPIRABLE.to_vec();
        statuses.push(ChargeStatus::AuthorisationSuccess);

        let stale = self
            .store
            .charges_for_expiry(&statuses, cutoff, self.batch_size)
            .await?;

        let mut expired = 0;
        for charge in stale {
            let swept = if DIRECT_EXPIRABLE.contains(&charge.status) {
                self.expire_directly(charge.id, charge.status).await?
            } else {
                self.expire_with_gateway_cancel(charge.id).await?
            };
            if swept {
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn expire_directly(&self, charge_id: i64, current: ChargeStatus) -> Result<bool> {
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

        transition_charge(
            self.store.as_ref(),
            account.payment_provider.variant(),
            charge_id,
            &[current],
            ChargeStatus::Expired,
            None,
        )
        .await
    }

    async fn expire_with_gateway_cancel(&self, charge_id: i64) -> Result<bool> {
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
            &[ChargeStatus::AuthorisationSuccess],
            ChargeStatus::ExpireCancelReady,
            None,
        )
        .await?;
        if !claimed {
            return Ok(false);
        }

        let client = self.gateways.client_for(account.payment_provider)?;
        let target = match client.cancel(&account, &charge).await {
            Ok(_) => ChargeStatus::Expired,
            Err(GatewayError::Retryable(reason)) | Err(GatewayError::Terminal(reason)) => {
                tracing::warn!(charge = %charge.external_id, reason, "gateway cancel failed during expiry");
                ChargeStatus::ExpireCancelFailed
            }
        };

        transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::ExpireCancelReady],
            target,
            None,
        )
        .await?;
        Ok(target == ChargeStatus::Expired)
    }
}

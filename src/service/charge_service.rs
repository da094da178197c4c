use crate::domain::account::GatewayAccount;
use crate::domain::charge::{AuthCardDetails, Charge, ChargeStatus, CreateChargeRequest};
use crate::domain::error::ConnectorError;
use crate::domain::event::ChargeEvent;
use crate::gateways::{AuthoriseStatus, CancelStatus, GatewayError, GatewayRegistry};
use crate::service::transitioner::transition_charge;
use crate::store::{ConnectorStore, NewCharge};
use crate::transitions::validator;
use std::sync::Arc;
use uuid::Uuid;

/// Interface the API layer drives: charge creation, card authorisation,
/// capture approval, explicit cancels and the event timeline. Every status
/// write funnels through the validator plus the conditional update.
#[derive(Clone)]
pub struct ChargeService {
    pub store: Arc<dyn ConnectorStore>,
    pub gateways: GatewayRegistry,
}

impl ChargeService {
    pub async fn create_charge(
        &self,
        gateway_account_id: i64,
        req: CreateChargeRequest,
    ) -> Result<Charge, ConnectorError> {
        if req.amount <= 0 {
            return Err(ConnectorError::Invalid("amount must be greater than zero".to_string()));
        }
        if req.return_url.is_empty() {
            return Err(ConnectorError::Invalid("return_url is required".to_string()));
        }

        self.account(gateway_account_id).await?;

        let charge = self
            .store
            .insert_charge(NewCharge {
                external_id: Uuid::new_v4().simple().to_string(),
                gateway_account_id,
                amount: req.amount,
                return_url: req.return_url,
                reference: req.reference,
                description: req.description,
                email: req.email,
            })
            .await?;

        tracing::info!(charge = %charge.external_id, amount = charge.amount, "charge created");
        Ok(charge)
    }

    pub async fn find_charge(&self, external_id: &str) -> Result<Charge, ConnectorError> {
        self.store
            .find_charge_by_external_id(external_id)
            .await?
            .ok_or_else(|| ConnectorError::ChargeNotFound(external_id.to_string()))
    }

    pub async fn charge_events(&self, external_id: &str) -> Result<Vec<ChargeEvent>, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        Ok(self.store.charge_events(charge.id).await?)
    }

    /// Direct status change requested by the API layer (e.g. the frontend
    /// marking a charge `ENTERING_CARD_DETAILS`). The charge's current
    /// status is the only accepted origin, so a concurrent move by another
    /// actor surfaces as a conflict rather than a silent overwrite.
    pub async fn transition_charge_status(
        &self,
        external_id: &str,
        to: ChargeStatus,
    ) -> Result<Charge, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        let account = self.account(charge.gateway_account_id).await?;
        let variant = account.payment_provider.variant();

        if !validator::charge_transition_allowed(variant, charge.status, to) {
            return Err(ConnectorError::IllegalTransition {
                from: charge.status.to_string(),
                to: to.to_string(),
            });
        }

        let applied =
            transition_charge(self.store.as_ref(), variant, charge.id, &[charge.status], to, None)
                .await?;
        if !applied {
            return Err(ConnectorError::Conflict);
        }

        self.find_charge(external_id).await
    }

    /// Card authorisation. Claims `AUTHORISATION_READY` before the gateway
    /// round trip, so only one submission of the same charge ever reaches
    /// the provider.
    pub async fn authorise(
        &self,
        external_id: &str,
        card: AuthCardDetails,
    ) -> Result<Charge, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        let account = self.account(charge.gateway_account_id).await?;
        let variant = account.payment_provider.variant();

        if !validator::charge_transition_allowed(
            variant,
            charge.status,
            ChargeStatus::AuthorisationReady,
        ) {
            return Err(ConnectorError::IllegalTransition {
                from: charge.status.to_string(),
                to: ChargeStatus::AuthorisationReady.to_string(),
            });
        }

        let claimed = transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::EnteringCardDetails],
            ChargeStatus::AuthorisationReady,
            None,
        )
        .await?;
        if !claimed {
            return Err(ConnectorError::Conflict);
        }

        self.store.set_charge_card_details(charge.id, &card.snapshot()).await?;

        let client = self.gateways.client_for(account.payment_provider)?;
        let target = match client.authorise(&account, &charge, &card).await {
            Ok(response) => {
                if let Some(transaction_id) = response.transaction_id.as_deref() {
                    self.store
                        .set_charge_transaction_id(
                            charge.id,
                            transaction_id,
                            response.session_id.as_deref(),
                        )
                        .await?;
                }
                match response.status {
                    AuthoriseStatus::Authorised => ChargeStatus::AuthorisationSuccess,
                    AuthoriseStatus::Submitted => ChargeStatus::AuthorisationSubmitted,
                    AuthoriseStatus::Requires3ds => ChargeStatus::Authorisation3dsRequired,
                    AuthoriseStatus::Rejected => ChargeStatus::AuthorisationRejected,
                    AuthoriseStatus::Error => ChargeStatus::AuthorisationError,
                }
            }
            Err(err) => {
                tracing::warn!(charge = %external_id, error = %err, "authorisation failed at gateway");
                ChargeStatus::AuthorisationError
            }
        };

        transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::AuthorisationReady],
            target,
            None,
        )
        .await?;

        self.find_charge(external_id).await
    }

    /// Second authorisation leg after a 3DS challenge.
    pub async fn authorise_3ds(&self, external_id: &str) -> Result<Charge, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        let account = self.account(charge.gateway_account_id).await?;
        let variant = account.payment_provider.variant();

        if !validator::charge_transition_allowed(
            variant,
            charge.status,
            ChargeStatus::Authorisation3dsReady,
        ) {
            return Err(ConnectorError::IllegalTransition {
                from: charge.status.to_string(),
                to: ChargeStatus::Authorisation3dsReady.to_string(),
            });
        }

        let claimed = transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::Authorisation3dsRequired],
            ChargeStatus::Authorisation3dsReady,
            None,
        )
        .await?;
        if !claimed {
            return Err(ConnectorError::Conflict);
        }

        let client = self.gateways.client_for(account.payment_provider)?;
        let target = match client.authorise_3ds(&account, &charge).await {
            Ok(response) => {
                if let Some(transaction_id) = response.transaction_id.as_deref() {
                    self.store
                        .set_charge_transaction_id(charge.id, transaction_id, None)
                        .await?;
                }
                match response.status {
                    AuthoriseStatus::Authorised => ChargeStatus::AuthorisationSuccess,
                    AuthoriseStatus::Rejected => ChargeStatus::AuthorisationRejected,
                    _ => ChargeStatus::AuthorisationError,
                }
            }
            Err(err) => {
                tracing::warn!(charge = %external_id, error = %err, "3DS authorisation failed at gateway");
                ChargeStatus::AuthorisationError
            }
        };

        transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[ChargeStatus::Authorisation3dsReady],
            target,
            None,
        )
        .await?;

        self.find_charge(external_id).await
    }

    /// Marks an authorised charge ready for the capture engine.
    pub async fn approve_capture(&self, external_id: &str) -> Result<Charge, ConnectorError> {
        self.transition_charge_status(external_id, ChargeStatus::CaptureApproved).await
    }

    pub async fn cancel_by_user(&self, external_id: &str) -> Result<Charge, ConnectorError> {
        self.cancel(
            external_id,
            ChargeStatus::UserCancelReady,
            ChargeStatus::UserCancelled,
            ChargeStatus::UserCancelError,
        )
        .await
    }

    pub async fn cancel_by_service(&self, external_id: &str) -> Result<Charge, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        let account = self.account(charge.gateway_account_id).await?;
        let variant = account.payment_provider.variant();

        // Pre-authorisation charges cancel in one hop with no gateway call.
        if matches!(charge.status, ChargeStatus::Created | ChargeStatus::EnteringCardDetails) {
            let applied = transition_charge(
                self.store.as_ref(),
                variant,
                charge.id,
                &[charge.status],
                ChargeStatus::SystemCancelled,
                None,
            )
            .await?;
            if !applied {
                return Err(ConnectorError::Conflict);
            }
            return self.find_charge(external_id).await;
        }

        self.cancel(
            external_id,
            ChargeStatus::SystemCancelReady,
            ChargeStatus::SystemCancelled,
            ChargeStatus::SystemCancelError,
        )
        .await
    }

    /// Claim-then-call-then-resolve cancellation. Charges the gateway has
    /// never seen resolve without a provider call.
    async fn cancel(
        &self,
        external_id: &str,
        ready: ChargeStatus,
        done: ChargeStatus,
        failed: ChargeStatus,
    ) -> Result<Charge, ConnectorError> {
        let charge = self.find_charge(external_id).await?;
        let account = self.account(charge.gateway_account_id).await?;
        let variant = account.payment_provider.variant();

        if !validator::charge_transition_allowed(variant, charge.status, ready) {
            return Err(ConnectorError::IllegalTransition {
                from: charge.status.to_string(),
                to: ready.to_string(),
            });
        }

        let claimed = transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &[charge.status],
            ready,
            None,
        )
        .await?;
        if !claimed {
            return Err(ConnectorError::Conflict);
        }

        let target = if charge.gateway_transaction_id.is_none() {
            done
        } else {
            let client = self.gateways.client_for(account.payment_provider)?;
            match client.cancel(&account, &charge).await {
                Ok(response) => match response.status {
                    CancelStatus::Cancelled | CancelStatus::Submitted => done,
                },
                Err(GatewayError::Retryable(reason)) | Err(GatewayError::Terminal(reason)) => {
                    tracing::warn!(charge = %external_id, reason, "gateway cancel failed");
                    failed
                }
            }
        };

        transition_charge(self.store.as_ref(), variant, charge.id, &[ready], target, None).await?;
        self.find_charge(external_id).await
    }

    async fn account(&self, id: i64) -> Result<GatewayAccount, ConnectorError> {
        self.store
            .find_account(id)
            .await?
            .ok_or(ConnectorError::AccountNotFound(id))
    }
}

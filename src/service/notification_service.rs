use crate::domain::account::PaymentProvider;
use crate::domain::notification::InboundNotification;
use crate::gateways::status_mapper::{map_provider_status, MappedStatus};
use crate::service::reference_matcher;
use crate::service::transitioner::{transition_charge, transition_refund};
use crate::store::ConnectorStore;
use crate::transitions::validator;
use anyhow::Result;
use std::sync::Arc;

/// What became of one inbound notification. Everything except `Applied` is a
/// discard; discards are logged, acknowledged to the sender, and never
/// mutate payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    UnknownStatusCode,
    Unmatched,
    Duplicate,
    IllegalTransition,
    LostRace,
}

/// Applies externally-sourced status changes through the same legality and
/// concurrency gates as internal ones. Deliveries are at-least-once, out of
/// order, and concurrent with the engines, so every step here must survive
/// a racing writer on the same record.
#[derive(Clone)]
pub struct NotificationService {
    pub store: Arc<dyn ConnectorStore>,
}

impl NotificationService {
    pub async fn reconcile(
        &self,
        provider: PaymentProvider,
        notification: InboundNotification,
    ) -> Result<ReconcileOutcome> {
        let Some(mapped) = map_provider_status(provider, &notification.status_code) else {
            tracing::info!(
                provider = provider.as_str(),
                code = %notification.status_code,
                reference = %notification.reference,
                "discarding notification with unknown status code"
            );
            return Ok(ReconcileOutcome::UnknownStatusCode);
        };

        match mapped {
            MappedStatus::Charge(target) => self.reconcile_charge(provider, notification, target).await,
            MappedStatus::Refund(target) => self.reconcile_refund(provider, notification, target).await,
        }
    }

    async fn reconcile_charge(
        &self,
        provider: PaymentProvider,
        notification: InboundNotification,
        target: crate::domain::charge::ChargeStatus,
    ) -> Result<ReconcileOutcome> {
        let Some(charge) =
            reference_matcher::resolve_charge(self.store.as_ref(), provider, &notification.reference)
                .await?
        else {
            tracing::info!(
                provider = provider.as_str(),
                reference = %notification.reference,
                "discarding notification matching no charge"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        // Gateways redeliver; an event with this status already on record
        // means this delivery is a duplicate.
        if self.store.count_charge_events(charge.id, target).await? > 0 {
            tracing::info!(charge = %charge.external_id, status = %target, "discarding duplicate notification");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let variant = provider.variant();
        if !validator::charge_transition_allowed(variant, charge.status, target) {
            tracing::info!(
                charge = %charge.external_id,
                from = %charge.status,
                to = %target,
                "discarding notification requesting illegal transition"
            );
            return Ok(ReconcileOutcome::IllegalTransition);
        }

        // Full legal origin set, not the status we just read: a concurrent
        // actor may move the charge between the read and the write, and the
        // conditional update is the authority on which origin actually held.
        let origins = validator::legal_origins(variant, target);
        let applied = transition_charge(
            self.store.as_ref(),
            variant,
            charge.id,
            &origins,
            target,
            notification.event_time,
        )
        .await?;

        if applied {
            tracing::info!(charge = %charge.external_id, status = %target, "notification applied");
            Ok(ReconcileOutcome::Applied)
        } else {
            tracing::info!(charge = %charge.external_id, status = %target, "notification lost race, discarded");
            Ok(ReconcileOutcome::LostRace)
        }
    }

    async fn reconcile_refund(
        &self,
        provider: PaymentProvider,
        notification: InboundNotification,
        target: crate::domain::refund::RefundStatus,
    ) -> Result<ReconcileOutcome> {
        let Some(refund) =
            reference_matcher::resolve_refund(self.store.as_ref(), provider, &notification.reference)
                .await?
        else {
            tracing::info!(
                provider = provider.as_str(),
                reference = %notification.reference,
                "discarding notification matching no refund"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        if self.store.count_refund_events(refund.id, target).await? > 0 {
            tracing::info!(refund = %refund.external_id, status = %target, "discarding duplicate notification");
            return Ok(ReconcileOutcome::Duplicate);
        }

        if !validator::refund_transition_allowed(refund.status, target) {
            tracing::info!(
                refund = %refund.external_id,
                from = %refund.status,
                to = %target,
                "discarding notification requesting illegal transition"
            );
            return Ok(ReconcileOutcome::IllegalTransition);
        }

        let origins = validator::refund_legal_origins(target);
        let applied = transition_refund(
            self.store.as_ref(),
            refund.id,
            &origins,
            target,
            notification.event_time,
        )
        .await?;

        if applied {
            tracing::info!(refund = %refund.external_id, status = %target, "notification applied");
            Ok(ReconcileOutcome::Applied)
        } else {
            tracing::info!(refund = %refund.external_id, status = %target, "notification lost race, discarded");
            Ok(ReconcileOutcome::LostRace)
        }
    }
}

use crate::domain::account::PaymentProvider;
use crate::domain::notification::InboundNotification;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct NotificationBatch {
    pub notifications: Vec<InboundNotification>,
}

/// Webhook entry point. Senders are acknowledged no matter what happened
/// internally; a non-2xx answer would only provoke a redelivery storm for
/// notifications we have already decided to discard.
pub async fn receive(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(batch): Json<NotificationBatch>,
) -> impl IntoResponse {
    let Some(provider) = PaymentProvider::from_str(&provider) else {
        tracing::warn!(provider = %provider, "notification for unknown provider discarded");
        return (StatusCode::OK, "[OK]");
    };

    for notification in batch.notifications {
        match state.notification_service.reconcile(provider, notification).await {
            Ok(outcome) => {
                tracing::debug!(provider = provider.as_str(), ?outcome, "notification handled");
            }
            Err(err) => {
                tracing::error!(provider = provider.as_str(), error = %err, "notification processing failed");
            }
        }
    }

    (StatusCode::OK, "[OK]")
}

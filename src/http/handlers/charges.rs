use crate::domain::charge::{AuthCardDetails, Charge, CreateChargeRequest, ExternalChargeState};
use crate::domain::error::ConnectorError;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub charge_id: String,
    pub amount: i64,
    pub state: ExternalChargeState,
    pub status: String,
    pub gateway_account_id: i64,
    pub gateway_transaction_id: Option<String>,
    pub reference: String,
    pub description: String,
    pub return_url: String,
    pub email: Option<String>,
    pub card_details: Option<crate::domain::charge::CardDetailsSnapshot>,
    pub created_date: DateTime<Utc>,
}

impl From<Charge> for ChargeResponse {
    fn from(charge: Charge) -> Self {
        Self {
            charge_id: charge.external_id,
            amount: charge.amount,
            state: charge.status.to_external(),
            status: charge.status.as_str().to_string(),
            gateway_account_id: charge.gateway_account_id,
            gateway_transaction_id: charge.gateway_transaction_id,
            reference: charge.reference,
            description: charge.description,
            return_url: charge.return_url,
            email: charge.email,
            card_details: charge.card_details,
            created_date: charge.created_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChargeEventsResponse {
    pub charge_id: String,
    pub events: Vec<ChargeEventEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChargeEventEntry {
    pub status: String,
    pub state: ExternalChargeState,
    pub gateway_event_time: Option<DateTime<Utc>>,
    pub updated: DateTime<Utc>,
}

async fn charge_for_account(
    state: &AppState,
    account_id: i64,
    charge_id: &str,
) -> Result<Charge, ConnectorError> {
    let charge = state.charge_service.find_charge(charge_id).await?;
    if charge.gateway_account_id != account_id {
        return Err(ConnectorError::ChargeNotFound(charge_id.to_string()));
    }
    Ok(charge)
}

pub async fn create_charge(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
    Json(req): Json<CreateChargeRequest>,
) -> impl IntoResponse {
    match state.charge_service.create_charge(account_id, req).await {
        Ok(charge) => (StatusCode::CREATED, Json(ChargeResponse::from(charge))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_charge(
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(i64, String)>,
) -> impl IntoResponse {
    match charge_for_account(&state, account_id, &charge_id).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_charge_events(
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(i64, String)>,
) -> impl IntoResponse {
    if let Err(err) = charge_for_account(&state, account_id, &charge_id).await {
        return err.into_response();
    }
    match state.charge_service.charge_events(&charge_id).await {
        Ok(events) => Json(ChargeEventsResponse {
            charge_id,
            events: events
                .into_iter()
                .map(|e| ChargeEventEntry {
                    status: e.status.as_str().to_string(),
                    state: e.status.to_external(),
                    gateway_event_time: e.gateway_event_time,
                    updated: e.updated,
                })
                .collect(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Merchant-initiated cancel.
pub async fn cancel_charge(
    State(state): State<AppState>,
    Path((account_id, charge_id)): Path<(i64, String)>,
) -> impl IntoResponse {
    if let Err(err) = charge_for_account(&state, account_id, &charge_id).await {
        return err.into_response();
    }
    match state.charge_service.cancel_by_service(&charge_id).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Frontend: payer has landed on the card page.
pub async fn start_card_entry(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
) -> impl IntoResponse {
    match state
        .charge_service
        .transition_charge_status(&charge_id, crate::domain::charge::ChargeStatus::EnteringCardDetails)
        .await
    {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Frontend: card details submitted for authorisation.
pub async fn authorise(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
    Json(card): Json<AuthCardDetails>,
) -> impl IntoResponse {
    match state.charge_service.authorise(&charge_id, card).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Frontend: payer has completed the 3DS challenge.
pub async fn authorise_3ds(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
) -> impl IntoResponse {
    match state.charge_service.authorise_3ds(&charge_id).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Frontend: payer confirmed; queue the charge for capture.
pub async fn approve_capture(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
) -> impl IntoResponse {
    match state.charge_service.approve_capture(&charge_id).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Frontend: payer abandoned the payment.
pub async fn user_cancel(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
) -> impl IntoResponse {
    match state.charge_service.cancel_by_user(&charge_id).await {
        Ok(charge) => Json(ChargeResponse::from(charge)).into_response(),
        Err(err) => err.into_response(),
    }
}

use crate::domain::refund::{CreateRefundRequest, Refund, RefundStatus};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refund_id: String,
    pub amount: i64,
    pub status: RefundStatus,
    pub created_date: DateTime<Utc>,
    pub user_external_id: Option<String>,
}

impl From<Refund> for RefundResponse {
    fn from(refund: Refund) -> Self {
        Self {
            refund_id: refund.external_id,
            amount: refund.amount,
            status: refund.status,
            created_date: refund.created_date,
            user_external_id: refund.user_external_id,
        }
    }
}

pub async fn create_refund(
    State(state): State<AppState>,
    Path((_account_id, charge_id)): Path<(i64, String)>,
    Json(req): Json<CreateRefundRequest>,
) -> impl IntoResponse {
    match state.refund_service.create_refund(&charge_id, req).await {
        Ok(refund) => (StatusCode::ACCEPTED, Json(RefundResponse::from(refund))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_refund(
    State(state): State<AppState>,
    Path((_account_id, _charge_id, refund_id)): Path<(i64, String, String)>,
) -> impl IntoResponse {
    match state.refund_service.find_refund(&refund_id).await {
        Ok(refund) => Json(RefundResponse::from(refund)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_refunds(
    State(state): State<AppState>,
    Path((_account_id, charge_id)): Path<(i64, String)>,
) -> impl IntoResponse {
    match state.refund_service.refunds_for_charge(&charge_id).await {
        Ok(refunds) => Json(
            refunds
                .into_iter()
                .map(RefundResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => err.into_response(),
    }
}

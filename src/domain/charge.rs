use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal lifecycle status of a charge. The set is closed: every status a
/// charge can ever hold appears here, and the transition tables decide which
/// hops between them are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Created,
    EnteringCardDetails,
    AuthorisationReady,
    AuthorisationSubmitted,
    Authorisation3dsRequired,
    Authorisation3dsReady,
    AuthorisationSuccess,
    AuthorisationRejected,
    AuthorisationError,
    AuthorisationCancelled,
    CaptureApproved,
    CaptureApprovedRetry,
    CaptureReady,
    CaptureSubmitted,
    CaptureError,
    Captured,
    ExpireCancelReady,
    ExpireCancelFailed,
    Expired,
    SystemCancelReady,
    SystemCancelError,
    SystemCancelled,
    UserCancelReady,
    UserCancelError,
    UserCancelled,
}

/// Status string the public API reports for a charge. Several internal
/// statuses collapse onto one external state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalChargeState {
    Created,
    Started,
    Submitted,
    Success,
    Failed,
    Cancelled,
    Error,
}

impl ChargeStatus {
    pub const ALL: [ChargeStatus; 25] = [
        ChargeStatus::Created,
        ChargeStatus::EnteringCardDetails,
        ChargeStatus::AuthorisationReady,
        ChargeStatus::AuthorisationSubmitted,
        ChargeStatus::Authorisation3dsRequired,
        ChargeStatus::Authorisation3dsReady,
        ChargeStatus::AuthorisationSuccess,
        ChargeStatus::AuthorisationRejected,
        ChargeStatus::AuthorisationError,
        ChargeStatus::AuthorisationCancelled,
        ChargeStatus::CaptureApproved,
        ChargeStatus::CaptureApprovedRetry,
        ChargeStatus::CaptureReady,
        ChargeStatus::CaptureSubmitted,
        ChargeStatus::CaptureError,
        ChargeStatus::Captured,
        ChargeStatus::ExpireCancelReady,
        ChargeStatus::ExpireCancelFailed,
        ChargeStatus::Expired,
        ChargeStatus::SystemCancelReady,
        ChargeStatus::SystemCancelError,
        ChargeStatus::SystemCancelled,
        ChargeStatus::UserCancelReady,
        ChargeStatus::UserCancelError,
        ChargeStatus::UserCancelled,
    ];

    /// Stable storage representation, also used on the wire for events.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Created => "CREATED",
            ChargeStatus::EnteringCardDetails => "ENTERING_CARD_DETAILS",
            ChargeStatus::AuthorisationReady => "AUTHORISATION_READY",
            ChargeStatus::AuthorisationSubmitted => "AUTHORISATION_SUBMITTED",
            ChargeStatus::Authorisation3dsRequired => "AUTHORISATION_3DS_REQUIRED",
            ChargeStatus::Authorisation3dsReady => "AUTHORISATION_3DS_READY",
            ChargeStatus::AuthorisationSuccess => "AUTHORISATION_SUCCESS",
            ChargeStatus::AuthorisationRejected => "AUTHORISATION_REJECTED",
            ChargeStatus::AuthorisationError => "AUTHORISATION_ERROR",
            ChargeStatus::AuthorisationCancelled => "AUTHORISATION_CANCELLED",
            ChargeStatus::CaptureApproved => "CAPTURE_APPROVED",
            ChargeStatus::CaptureApprovedRetry => "CAPTURE_APPROVED_RETRY",
            ChargeStatus::CaptureReady => "CAPTURE_READY",
            ChargeStatus::CaptureSubmitted => "CAPTURE_SUBMITTED",
            ChargeStatus::CaptureError => "CAPTURE_ERROR",
            ChargeStatus::Captured => "CAPTURED",
            ChargeStatus::ExpireCancelReady => "EXPIRE_CANCEL_READY",
            ChargeStatus::ExpireCancelFailed => "EXPIRE_CANCEL_FAILED",
            ChargeStatus::Expired => "EXPIRED",
            ChargeStatus::SystemCancelReady => "SYSTEM_CANCEL_READY",
            ChargeStatus::SystemCancelError => "SYSTEM_CANCEL_ERROR",
            ChargeStatus::SystemCancelled => "SYSTEM_CANCELLED",
            ChargeStatus::UserCancelReady => "USER_CANCEL_READY",
            ChargeStatus::UserCancelError => "USER_CANCEL_ERROR",
            ChargeStatus::UserCancelled => "USER_CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<ChargeStatus> {
        ChargeStatus::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    pub fn to_external(&self) -> ExternalChargeState {
        match self {
            ChargeStatus::Created => ExternalChargeState::Created,
            ChargeStatus::EnteringCardDetails
            | ChargeStatus::AuthorisationReady
            | ChargeStatus::AuthorisationSubmitted
            | ChargeStatus::Authorisation3dsRequired
            | ChargeStatus::Authorisation3dsReady => ExternalChargeState::Started,
            ChargeStatus::AuthorisationSuccess
            | ChargeStatus::CaptureApproved
            | ChargeStatus::CaptureApprovedRetry
            | ChargeStatus::CaptureReady
            | ChargeStatus::CaptureSubmitted => ExternalChargeState::Submitted,
            ChargeStatus::Captured => ExternalChargeState::Success,
            ChargeStatus::AuthorisationRejected | ChargeStatus::Expired => {
                ExternalChargeState::Failed
            }
            ChargeStatus::AuthorisationCancelled
            | ChargeStatus::SystemCancelled
            | ChargeStatus::UserCancelled => ExternalChargeState::Cancelled,
            ChargeStatus::AuthorisationError
            | ChargeStatus::CaptureError
            | ChargeStatus::ExpireCancelReady
            | ChargeStatus::ExpireCancelFailed
            | ChargeStatus::SystemCancelReady
            | ChargeStatus::SystemCancelError
            | ChargeStatus::UserCancelReady
            | ChargeStatus::UserCancelError => ExternalChargeState::Error,
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the card details a charge was authorised with. Captured once
/// at authorisation time; PAN is stored masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetailsSnapshot {
    pub cardholder_name: String,
    pub last_four_digits: String,
    pub first_six_digits: String,
    pub expiry_date: String,
    pub card_brand: String,
}

/// One payment attempt. Never deleted; its `status` only moves along edges
/// of the owning account's transition table.
#[derive(Debug, Clone, Serialize)]
pub struct Charge {
    pub id: i64,
    pub external_id: String,
    pub gateway_account_id: i64,
    pub amount: i64,
    pub status: ChargeStatus,
    pub gateway_transaction_id: Option<String>,
    pub provider_session_id: Option<String>,
    pub return_url: String,
    pub reference: String,
    pub description: String,
    pub email: Option<String>,
    pub card_details: Option<CardDetailsSnapshot>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChargeRequest {
    pub amount: i64,
    pub reference: String,
    pub description: String,
    pub return_url: String,
    pub email: Option<String>,
}

/// Card details as submitted by the frontend for authorisation.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthCardDetails {
    pub cardholder_name: String,
    pub card_number: String,
    pub cvc: String,
    pub expiry_date: String,
    pub card_brand: String,
}

impl AuthCardDetails {
    pub fn snapshot(&self) -> CardDetailsSnapshot {
        let digits: String = self.card_number.chars().filter(|c| c.is_ascii_digit()).collect();
        let first_six = digits.chars().take(6).collect();
        let last_four = if digits.len() >= 4 {
            digits[digits.len() - 4..].to_string()
        } else {
            digits.clone()
        };
        CardDetailsSnapshot {
            cardholder_name: self.cardholder_name.clone(),
            last_four_digits: last_four,
            first_six_digits: first_six,
            expiry_date: self.expiry_date.clone(),
            card_brand: self.card_brand.clone(),
        }
    }
}

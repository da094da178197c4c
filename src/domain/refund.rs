use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Created,
    RefundSubmitted,
    Refunded,
    RefundError,
}

impl RefundStatus {
    pub const ALL: [RefundStatus; 4] = [
        RefundStatus::Created,
        RefundStatus::RefundSubmitted,
        RefundStatus::Refunded,
        RefundStatus::RefundError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Created => "CREATED",
            RefundStatus::RefundSubmitted => "REFUND_SUBMITTED",
            RefundStatus::Refunded => "REFUNDED",
            RefundStatus::RefundError => "REFUND_ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<RefundStatus> {
        RefundStatus::ALL.iter().copied().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One refund attempt against a charge. The API layer enforces that refund
/// amounts never exceed the charge's capturable amount before a row exists;
/// this record only tracks status legality.
#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub id: i64,
    pub external_id: String,
    pub charge_id: i64,
    pub amount: i64,
    pub status: RefundStatus,
    pub gateway_transaction_id: Option<String>,
    pub user_external_id: Option<String>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRefundRequest {
    pub amount: i64,
    pub user_external_id: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A gateway event already parsed out of the provider's wire format by the
/// ingestion layer. Delivery is at-least-once and unordered; the
/// reconciliation handler owns making it safe to apply.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundNotification {
    pub reference: String,
    pub status_code: String,
    pub event_time: Option<DateTime<Utc>>,
}

use crate::domain::charge::ChargeStatus;
use crate::domain::refund::RefundStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable fact: charge X reached status S. `updated` is when this
/// service recorded the transition; `gateway_event_time` is the gateway's
/// own timestamp when a notification supplied one, which is authoritative
/// about when the thing actually happened.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeEvent {
    pub id: i64,
    pub charge_id: i64,
    pub status: ChargeStatus,
    pub gateway_event_time: Option<DateTime<Utc>>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundEvent {
    pub id: i64,
    pub refund_id: i64,
    pub status: RefundStatus,
    pub gateway_event_time: Option<DateTime<Utc>>,
    pub updated: DateTime<Utc>,
}

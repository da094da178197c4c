use crate::domain::account::PaymentProvider;
use crate::domain::charge::ChargeStatus;
use crate::domain::refund::RefundStatus;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Internal status a provider status code maps onto. A single notification
/// stream carries both charge and refund events, so the mapping decides
/// which record kind the reconciliation handler should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedStatus {
    Charge(ChargeStatus),
    Refund(RefundStatus),
}

static WORLDPAY_CODES: Lazy<HashMap<&'static str, MappedStatus>> = Lazy::new(|| {
    HashMap::from([
        ("AUTHORISED", MappedStatus::Charge(ChargeStatus::AuthorisationSuccess)),
        ("REFUSED", MappedStatus::Charge(ChargeStatus::AuthorisationRejected)),
        ("CAPTURED", MappedStatus::Charge(ChargeStatus::Captured)),
        ("CANCELLED", MappedStatus::Charge(ChargeStatus::SystemCancelled)),
        ("REFUNDED", MappedStatus::Refund(RefundStatus::Refunded)),
        ("REFUNDED_BY_MERCHANT", MappedStatus::Refund(RefundStatus::Refunded)),
        ("REFUND_FAILED", MappedStatus::Refund(RefundStatus::RefundError)),
    ])
});

static SMARTPAY_CODES: Lazy<HashMap<&'static str, MappedStatus>> = Lazy::new(|| {
    HashMap::from([
        ("AUTHORISATION", MappedStatus::Charge(ChargeStatus::AuthorisationSuccess)),
        ("CAPTURE", MappedStatus::Charge(ChargeStatus::Captured)),
        ("CANCELLATION", MappedStatus::Charge(ChargeStatus::SystemCancelled)),
        ("REFUND", MappedStatus::Refund(RefundStatus::Refunded)),
        ("REFUND_FAILED", MappedStatus::Refund(RefundStatus::RefundError)),
    ])
});

// epdq quotes numeric status codes.
static EPDQ_CODES: Lazy<HashMap<&'static str, MappedStatus>> = Lazy::new(|| {
    HashMap::from([
        ("5", MappedStatus::Charge(ChargeStatus::AuthorisationSuccess)),
        ("2", MappedStatus::Charge(ChargeStatus::AuthorisationRejected)),
        ("9", MappedStatus::Charge(ChargeStatus::Captured)),
        ("6", MappedStatus::Charge(ChargeStatus::SystemCancelled)),
        ("8", MappedStatus::Refund(RefundStatus::Refunded)),
        ("83", MappedStatus::Refund(RefundStatus::RefundError)),
    ])
});

static SANDBOX_CODES: Lazy<HashMap<&'static str, MappedStatus>> = Lazy::new(|| {
    HashMap::from([
        ("AUTHORISED", MappedStatus::Charge(ChargeStatus::AuthorisationSuccess)),
        ("CAPTURED", MappedStatus::Charge(ChargeStatus::Captured)),
        ("REFUNDED", MappedStatus::Refund(RefundStatus::Refunded)),
    ])
});

/// Returns `None` for a code the provider map does not know. Unknown codes
/// are an observability concern only and must never mutate payment state.
pub fn map_provider_status(provider: PaymentProvider, code: &str) -> Option<MappedStatus> {
    let table = match provider {
        PaymentProvider::Sandbox => &SANDBOX_CODES,
        PaymentProvider::Worldpay => &WORLDPAY_CODES,
        PaymentProvider::Smartpay => &SMARTPAY_CODES,
        PaymentProvider::Epdq => &EPDQ_CODES,
    };
    table.get(code).copied()
}

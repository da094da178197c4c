use crate::domain::account::GatewayVariant;
use crate::domain::charge::ChargeStatus;
use crate::domain::refund::RefundStatus;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use ChargeStatus::*;

/// Directed graph of legal one-hop status changes. Statuses with no entry
/// (or an empty successor list) are terminal: nothing moves them again.
pub struct TransitionTable {
    edges: HashMap<ChargeStatus, Vec<ChargeStatus>>,
}

impl TransitionTable {
    fn new(edges: Vec<(ChargeStatus, Vec<ChargeStatus>)>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
        }
    }

    pub fn allows(&self, from: ChargeStatus, to: ChargeStatus) -> bool {
        self.edges
            .get(&from)
            .map(|succ| succ.contains(&to))
            .unwrap_or(false)
    }

    pub fn successors(&self, from: ChargeStatus) -> &[ChargeStatus] {
        self.edges.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every status that can legally precede `to` in one hop. This is the
    /// expected-status set handed to the conditional update when an external
    /// event names only the target.
    pub fn predecessors(&self, to: ChargeStatus) -> Vec<ChargeStatus> {
        ChargeStatus::ALL
            .iter()
            .copied()
            .filter(|from| self.allows(*from, to))
            .collect()
    }

    pub fn is_terminal(&self, status: ChargeStatus) -> bool {
        self.successors(status).is_empty()
    }
}

/// Table for asynchronous gateways (Worldpay, Smartpay, epdq): authorisation
/// and capture pass through a `*_SUBMITTED` hop and are confirmed by
/// notification later. `CAPTURE_READY -> CAPTURED` stays legal because a
/// capture-confirmed notification can overtake the submit bookkeeping.
static ASYNC_CHARGE_TABLE: Lazy<TransitionTable> = Lazy::new(|| {
    TransitionTable::new(vec![
        (Created, vec![EnteringCardDetails, SystemCancelled, Expired]),
        (
            EnteringCardDetails,
            vec![AuthorisationReady, UserCancelReady, SystemCancelled, Expired],
        ),
        (
            AuthorisationReady,
            vec![
                AuthorisationSubmitted,
                Authorisation3dsRequired,
                AuthorisationSuccess,
                AuthorisationRejected,
                AuthorisationError,
                AuthorisationCancelled,
            ],
        ),
        (
            AuthorisationSubmitted,
            vec![
                AuthorisationSuccess,
                AuthorisationRejected,
                AuthorisationError,
                Authorisation3dsRequired,
            ],
        ),
        (
            Authorisation3dsRequired,
            vec![Authorisation3dsReady, UserCancelReady, Expired],
        ),
        (
            Authorisation3dsReady,
            vec![
                AuthorisationSuccess,
                AuthorisationRejected,
                AuthorisationError,
                AuthorisationCancelled,
            ],
        ),
        (
            AuthorisationSuccess,
            vec![
                CaptureApproved,
                CaptureReady,
                SystemCancelReady,
                UserCancelReady,
                ExpireCancelReady,
            ],
        ),
        (CaptureApproved, vec![CaptureReady, CaptureError]),
        (CaptureApprovedRetry, vec![CaptureReady, CaptureError]),
        (
            CaptureReady,
            vec![CaptureSubmitted, CaptureApprovedRetry, CaptureError, Captured],
        ),
        (CaptureSubmitted, vec![Captured]),
        (ExpireCancelReady, vec![Expired, ExpireCancelFailed]),
        (SystemCancelReady, vec![SystemCancelled, SystemCancelError]),
        (UserCancelReady, vec![UserCancelled, UserCancelError]),
    ])
});

/// Table for the synchronous test gateway (sandbox): no round trip to wait
/// out, so the `*_SUBMITTED` and 3DS states have no inbound edges and
/// capture lands directly on `CAPTURED`.
static SYNC_CHARGE_TABLE: Lazy<TransitionTable> = Lazy::new(|| {
    TransitionTable::new(vec![
        (Created, vec![EnteringCardDetails, SystemCancelled, Expired]),
        (
            EnteringCardDetails,
            vec![AuthorisationReady, UserCancelReady, SystemCancelled, Expired],
        ),
        (
            AuthorisationReady,
            vec![
                AuthorisationSuccess,
                AuthorisationRejected,
                AuthorisationError,
                AuthorisationCancelled,
            ],
        ),
        (
            AuthorisationSuccess,
            vec![
                CaptureApproved,
                CaptureReady,
                SystemCancelReady,
                UserCancelReady,
                ExpireCancelReady,
            ],
        ),
        (CaptureApproved, vec![CaptureReady, CaptureError]),
        (CaptureApprovedRetry, vec![CaptureReady, CaptureError]),
        (CaptureReady, vec![Captured, CaptureApprovedRetry, CaptureError]),
        (ExpireCancelReady, vec![Expired, ExpireCancelFailed]),
        (SystemCancelReady, vec![SystemCancelled, SystemCancelError]),
        (UserCancelReady, vec![UserCancelled, UserCancelError]),
    ])
});

pub fn charge_table(variant: GatewayVariant) -> &'static TransitionTable {
    match variant {
        GatewayVariant::Asynchronous => &ASYNC_CHARGE_TABLE,
        GatewayVariant::Synchronous => &SYNC_CHARGE_TABLE,
    }
}

/// Refund graph is shared across variants; synchronous gateways just take
/// both hops inside one engine pass.
static REFUND_TABLE: Lazy<HashMap<RefundStatus, Vec<RefundStatus>>> = Lazy::new(|| {
    HashMap::from([
        (
            RefundStatus::Created,
            vec![RefundStatus::RefundSubmitted, RefundStatus::RefundError],
        ),
        (
            RefundStatus::RefundSubmitted,
            vec![RefundStatus::Refunded, RefundStatus::RefundError],
        ),
    ])
});

pub fn refund_successors(from: RefundStatus) -> &'static [RefundStatus] {
    REFUND_TABLE.get(&from).map(Vec::as_slice).unwrap_or(&[])
}

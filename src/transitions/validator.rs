use crate::domain::account::GatewayVariant;
use crate::domain::charge::ChargeStatus;
use crate::domain::refund::RefundStatus;
use crate::transitions::table::{charge_table, refund_successors};

/// Sole authority on charge transition legality. Pure, fails closed: a pair
/// absent from the variant's table is illegal.
pub fn charge_transition_allowed(
    variant: GatewayVariant,
    from: ChargeStatus,
    to: ChargeStatus,
) -> bool {
    charge_table(variant).allows(from, to)
}

pub fn refund_transition_allowed(from: RefundStatus, to: RefundStatus) -> bool {
    refund_successors(from).contains(&to)
}

pub fn is_terminal(variant: GatewayVariant, status: ChargeStatus) -> bool {
    charge_table(variant).is_terminal(status)
}

/// Legal one-hop origin set for a target status. Used by reconciliation,
/// which learns the destination from the gateway and must let the
/// conditional update decide which predecessor actually held.
pub fn legal_origins(variant: GatewayVariant, to: ChargeStatus) -> Vec<ChargeStatus> {
    charge_table(variant).predecessors(to)
}

pub fn refund_legal_origins(to: RefundStatus) -> Vec<RefundStatus> {
    RefundStatus::ALL
        .iter()
        .copied()
        .filter(|from| refund_transition_allowed(*from, to))
        .collect()
}

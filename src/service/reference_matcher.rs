use crate::domain::account::PaymentProvider;
use crate::domain::charge::Charge;
use crate::domain::refund::Refund;
use crate::store::ConnectorStore;
use anyhow::Result;

/// Resolves an inbound provider reference to the charge it belongs to.
/// Worldpay and the sandbox quote the transaction id directly; smartpay
/// quotes the PSP reference stored at authorisation; epdq quotes the
/// composite "payId/payIdSub" of which only the payId half identifies the
/// charge. No match is a normal outcome, not an error.
pub async fn resolve_charge(
    store: &dyn ConnectorStore,
    provider: PaymentProvider,
    reference: &str,
) -> Result<Option<Charge>> {
    let lookup = match provider {
        PaymentProvider::Epdq => reference.split('/').next().unwrap_or(reference),
        PaymentProvider::Sandbox | PaymentProvider::Worldpay | PaymentProvider::Smartpay => {
            reference
        }
    };
    store.find_charge_by_gateway_transaction_id(provider, lookup).await
}

/// Refund notifications always quote the reference the provider handed back
/// at submission, which the engine stored on the refund row verbatim (for
/// epdq that is already the full composite value).
pub async fn resolve_refund(
    store: &dyn ConnectorStore,
    provider: PaymentProvider,
    reference: &str,
) -> Result<Option<Refund>> {
    store.find_refund_by_gateway_reference(provider, reference).await
}

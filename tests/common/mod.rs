#![allow(dead_code)]

use payments_connector::domain::account::{AccountType, GatewayAccount, PaymentProvider};
use payments_connector::domain::charge::{AuthCardDetails, Charge, ChargeStatus};
use payments_connector::domain::refund::{Refund, RefundStatus};
use payments_connector::gateways::{
    AuthoriseResponse, AuthoriseStatus, CancelResponse, CancelStatus, CaptureResponse,
    CaptureStatus, GatewayClient, GatewayError, GatewayRegistry, RefundResponse,
    RefundSubmitStatus,
};
use payments_connector::store::memory::MemoryStore;
use payments_connector::store::{ConnectorStore, NewCharge, NewRefund};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const SANDBOX_ACCOUNT: i64 = 1;
pub const WORLDPAY_ACCOUNT: i64 = 2;
pub const SMARTPAY_ACCOUNT: i64 = 3;
pub const EPDQ_ACCOUNT: i64 = 4;

pub async fn store_with_accounts() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, provider) in [
        (SANDBOX_ACCOUNT, PaymentProvider::Sandbox),
        (WORLDPAY_ACCOUNT, PaymentProvider::Worldpay),
        (SMARTPAY_ACCOUNT, PaymentProvider::Smartpay),
        (EPDQ_ACCOUNT, PaymentProvider::Epdq),
    ] {
        store
            .insert_account(GatewayAccount {
                id,
                payment_provider: provider,
                account_type: AccountType::Test,
                service_name: "test service".to_string(),
            })
            .await
            .unwrap();
    }
    store
}

pub async fn create_charge(store: &dyn ConnectorStore, account_id: i64) -> Charge {
    store
        .insert_charge(NewCharge {
            external_id: uuid::Uuid::new_v4().simple().to_string(),
            gateway_account_id: account_id,
            amount: 5_000,
            return_url: "https://service.example/return".to_string(),
            reference: "order-42".to_string(),
            description: "a test payment".to_string(),
            email: None,
        })
        .await
        .unwrap()
}

/// Puts a freshly created charge straight into `status`. The store primitive
/// does not consult the transition tables, which is exactly what makes this
/// fixture shortcut possible.
pub async fn charge_in_status(
    store: &dyn ConnectorStore,
    account_id: i64,
    status: ChargeStatus,
    transaction_id: Option<&str>,
) -> Charge {
    let charge = create_charge(store, account_id).await;
    if status != ChargeStatus::Created {
        let outcome = store
            .transition_charge_status(charge.id, &[ChargeStatus::Created], status)
            .await
            .unwrap();
        assert!(outcome.applied);
    }
    if let Some(transaction_id) = transaction_id {
        store
            .set_charge_transaction_id(charge.id, transaction_id, None)
            .await
            .unwrap();
    }
    store.find_charge_by_id(charge.id).await.unwrap().unwrap()
}

pub async fn refund_in_status(
    store: &dyn ConnectorStore,
    charge: &Charge,
    status: RefundStatus,
    gateway_reference: Option<&str>,
) -> Refund {
    let refund = store
        .insert_refund(NewRefund {
            external_id: uuid::Uuid::new_v4().simple().to_string(),
            charge_id: charge.id,
            amount: charge.amount,
            user_external_id: None,
        })
        .await
        .unwrap();
    if status != RefundStatus::Created {
        let outcome = store
            .transition_refund_status(refund.id, &[RefundStatus::Created], status)
            .await
            .unwrap();
        assert!(outcome.applied);
    }
    if let Some(reference) = gateway_reference {
        store
            .set_refund_gateway_reference(refund.id, reference)
            .await
            .unwrap();
    }
    store.find_refund_by_id(refund.id).await.unwrap().unwrap()
}

pub fn card() -> AuthCardDetails {
    AuthCardDetails {
        cardholder_name: "J Doe".to_string(),
        card_number: "4242424242424242".to_string(),
        cvc: "123".to_string(),
        expiry_date: "11/29".to_string(),
        card_brand: "visa".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBehavior {
    CapturedNow,
    AcceptedPending,
    FailRetryable,
    FailTerminal,
}

/// Scripted gateway double that counts every money-affecting call, so tests
/// can pin down exactly how many times the provider was hit.
pub struct ScriptedGateway {
    pub provider: PaymentProvider,
    pub capture_behavior: CaptureBehavior,
    pub capture_calls: AtomicU64,
    pub refund_calls: AtomicU64,
    pub cancel_calls: AtomicU64,
}

impl ScriptedGateway {
    pub fn new(provider: PaymentProvider, capture_behavior: CaptureBehavior) -> Self {
        Self {
            provider,
            capture_behavior,
            capture_calls: AtomicU64::new(0),
            refund_calls: AtomicU64::new(0),
            cancel_calls: AtomicU64::new(0),
        }
    }

    pub fn capture_call_count(&self) -> u64 {
        self.capture_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GatewayClient for ScriptedGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn authorise(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
        _card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError> {
        Ok(AuthoriseResponse {
            status: AuthoriseStatus::Authorised,
            transaction_id: Some(format!("txn-{}", charge.external_id)),
            session_id: None,
        })
    }

    async fn authorise_3ds(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError> {
        Ok(AuthoriseResponse {
            status: AuthoriseStatus::Authorised,
            transaction_id: charge.gateway_transaction_id.clone(),
            session_id: None,
        })
    }

    async fn capture(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        match self.capture_behavior {
            CaptureBehavior::CapturedNow => Ok(CaptureResponse {
                status: CaptureStatus::Captured,
            }),
            CaptureBehavior::AcceptedPending => Ok(CaptureResponse {
                status: CaptureStatus::Pending,
            }),
            CaptureBehavior::FailRetryable => {
                Err(GatewayError::Retryable("simulated timeout".to_string()))
            }
            CaptureBehavior::FailTerminal => {
                Err(GatewayError::Terminal("simulated rejection".to_string()))
            }
        }
    }

    async fn refund(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
        refund: &Refund,
    ) -> Result<RefundResponse, GatewayError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RefundResponse {
            status: RefundSubmitStatus::Pending,
            reference: Some(format!("refund-ref-{}", refund.external_id)),
        })
    }

    async fn cancel(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<CancelResponse, GatewayError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CancelResponse {
            status: CancelStatus::Cancelled,
        })
    }
}

pub fn registry_with(clients: Vec<Arc<dyn GatewayClient>>) -> GatewayRegistry {
    let mut registry = GatewayRegistry::default();
    for client in clients {
        registry.register(client);
    }
    registry
}

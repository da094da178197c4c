use crate::config::AppConfig;
use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{AuthCardDetails, Charge};
use crate::domain::refund::Refund;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod epdq;
pub mod sandbox;
pub mod smartpay;
pub mod status_mapper;
pub mod worldpay;

/// Gateway failure kinds. Retryable failures (timeouts, 5xx, network) feed
/// the bounded retry loop; terminal ones move the record straight to its
/// error status and are never retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transient gateway failure: {0}")]
    Retryable(String),

    #[error("gateway rejected the operation: {0}")]
    Terminal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoriseStatus {
    Authorised,
    /// Accepted by the gateway; the definitive outcome arrives by
    /// notification.
    Submitted,
    Requires3ds,
    Rejected,
    Error,
}

#[derive(Debug, Clone)]
pub struct AuthoriseResponse {
    pub status: AuthoriseStatus,
    pub transaction_id: Option<String>,
    /// Secondary provider reference where the scheme has one (epdq
    /// pay-id-sub, smartpay session).
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Funds moved inside the call (synchronous gateways).
    Captured,
    /// Capture accepted; completion confirmed by notification.
    Pending,
}

#[derive(Debug, Clone)]
pub struct CaptureResponse {
    pub status: CaptureStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundSubmitStatus {
    Refunded,
    Pending,
}

#[derive(Debug, Clone)]
pub struct RefundResponse {
    pub status: RefundSubmitStatus,
    /// Provider's reference for this refund, used to match refund
    /// notifications later.
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStatus {
    Cancelled,
    Submitted,
}

#[derive(Debug, Clone)]
pub struct CancelResponse {
    pub status: CancelStatus,
}

/// Provider operations the lifecycle core depends on. Wire formats are
/// entirely the implementations' business; the core only sees these
/// normalized results and the retryable/terminal error split.
#[async_trait::async_trait]
pub trait GatewayClient: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn authorise(
        &self,
        account: &GatewayAccount,
        charge: &Charge,
        card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError>;

    async fn authorise_3ds(
        &self,
        account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError>;

    async fn capture(
        &self,
        account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError>;

    async fn refund(
        &self,
        account: &GatewayAccount,
        charge: &Charge,
        refund: &Refund,
    ) -> Result<RefundResponse, GatewayError>;

    async fn cancel(
        &self,
        account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CancelResponse, GatewayError>;
}

/// Provider-keyed set of gateway clients shared by the services and engines.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    clients: HashMap<PaymentProvider, Arc<dyn GatewayClient>>,
}

impl GatewayRegistry {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::default();
        registry.register(Arc::new(sandbox::SandboxGateway::default()));
        registry.register(Arc::new(worldpay::WorldpayGateway {
            base_url: cfg.worldpay_base_url.clone(),
            username: cfg.worldpay_username.clone(),
            password: cfg.worldpay_password.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: client.clone(),
        }));
        registry.register(Arc::new(smartpay::SmartpayGateway {
            base_url: cfg.smartpay_base_url.clone(),
            username: cfg.smartpay_username.clone(),
            password: cfg.smartpay_password.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: client.clone(),
        }));
        registry.register(Arc::new(epdq::EpdqGateway {
            base_url: cfg.epdq_base_url.clone(),
            psp_id: cfg.epdq_psp_id.clone(),
            api_key: cfg.epdq_api_key.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client,
        }));
        registry
    }

    pub fn register(&mut self, client: Arc<dyn GatewayClient>) {
        self.clients.insert(client.provider(), client);
    }

    pub fn client_for(&self, provider: PaymentProvider) -> anyhow::Result<Arc<dyn GatewayClient>> {
        self.clients
            .get(&provider)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no gateway client registered for {}", provider.as_str()))
    }
}

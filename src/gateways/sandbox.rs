use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{AuthCardDetails, Charge};
use crate::domain::refund::Refund;
use crate::gateways::{
    AuthoriseResponse, AuthoriseStatus, CancelResponse, CancelStatus, CaptureResponse,
    CaptureStatus, GatewayClient, GatewayError, RefundResponse, RefundSubmitStatus,
};

/// Synchronous test gateway. Every operation resolves in the call itself;
/// behaviour is steered by magic card numbers so test services can exercise
/// decline and error paths without a real provider.
pub struct SandboxGateway {
    pub behavior: SandboxBehavior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxBehavior {
    /// Decide from the card number (default).
    CardDriven,
    AlwaysSuccess,
    AlwaysRejected,
    AlwaysError,
}

const DECLINED_CARD: &str = "4000000000000002";
const ERROR_CARD: &str = "4000000000000119";

impl Default for SandboxGateway {
    fn default() -> Self {
        Self {
            behavior: SandboxBehavior::CardDriven,
        }
    }
}

#[async_trait::async_trait]
impl GatewayClient for SandboxGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Sandbox
    }

    async fn authorise(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
        card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let digits: String = card.card_number.chars().filter(|c| c.is_ascii_digit()).collect();
        let status = match self.behavior {
            SandboxBehavior::AlwaysSuccess => AuthoriseStatus::Authorised,
            SandboxBehavior::AlwaysRejected => AuthoriseStatus::Rejected,
            SandboxBehavior::AlwaysError => AuthoriseStatus::Error,
            SandboxBehavior::CardDriven => match digits.as_str() {
                DECLINED_CARD => AuthoriseStatus::Rejected,
                ERROR_CARD => AuthoriseStatus::Error,
                _ => AuthoriseStatus::Authorised,
            },
        };

        let transaction_id = match status {
            AuthoriseStatus::Authorised => Some(format!("sandbox-{}", uuid::Uuid::new_v4().simple())),
            _ => None,
        };

        Ok(AuthoriseResponse {
            status,
            transaction_id,
            session_id: None,
        })
    }

    async fn authorise_3ds(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError> {
        Err(GatewayError::Terminal(
            "sandbox does not issue 3DS challenges".to_string(),
        ))
    }

    async fn capture(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError> {
        Ok(CaptureResponse {
            status: CaptureStatus::Captured,
        })
    }

    async fn refund(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
        refund: &Refund,
    ) -> Result<RefundResponse, GatewayError> {
        Ok(RefundResponse {
            status: RefundSubmitStatus::Refunded,
            reference: Some(format!("sandbox-refund-{}", refund.external_id)),
        })
    }

    async fn cancel(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<CancelResponse, GatewayError> {
        Ok(CancelResponse {
            status: CancelStatus::Cancelled,
        })
    }
}

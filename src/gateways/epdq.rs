use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{AuthCardDetails, Charge};
use crate::domain::refund::Refund;
use crate::gateways::{
    AuthoriseResponse, AuthoriseStatus, CancelResponse, CancelStatus, CaptureResponse,
    CaptureStatus, GatewayClient, GatewayError, RefundResponse, RefundSubmitStatus,
};
use serde_json::json;

/// epdq client. References are composite: the platform assigns a PAYID at
/// authorisation and a PAYIDSUB per follow-up operation; notifications quote
/// them joined as "PAYID/PAYIDSUB".
pub struct EpdqGateway {
    pub base_url: String,
    pub psp_id: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl EpdqGateway {
    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.psp_id, Some(&self.api_key))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                r.json().await.map_err(|e| GatewayError::Retryable(e.to_string()))
            }
            Ok(r) if r.status().is_server_error() => {
                Err(GatewayError::Retryable(format!("epdq returned {}", r.status())))
            }
            Ok(r) => Err(GatewayError::Terminal(format!("epdq returned {}", r.status()))),
            Err(e) if e.is_timeout() => Err(GatewayError::Retryable("epdq timeout".to_string())),
            Err(e) => Err(GatewayError::Retryable(e.to_string())),
        }
    }

    fn pay_id(v: &serde_json::Value) -> Option<String> {
        v.get("payId").and_then(|p| p.as_str()).map(ToString::to_string)
    }
}

#[async_trait::async_trait]
impl GatewayClient for EpdqGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Epdq
    }

    async fn authorise(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
        card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let body = json!({
            "orderId": charge.external_id,
            "amount": charge.amount,
            "cardNo": card.card_number,
            "cn": card.cardholder_name,
            "cvc": card.cvc,
            "ed": card.expiry_date,
        });
        let v = self.post("/payments", body).await?;
        let status = match v.get("status").and_then(|s| s.as_i64()) {
            Some(5) => AuthoriseStatus::Authorised,
            Some(2) => AuthoriseStatus::Rejected,
            Some(50 | 51) => AuthoriseStatus::Submitted,
            _ => AuthoriseStatus::Error,
        };
        Ok(AuthoriseResponse {
            status,
            transaction_id: Self::pay_id(&v),
            session_id: v
                .get("payIdSub")
                .and_then(|p| p.as_str())
                .map(ToString::to_string),
        })
    }

    async fn authorise_3ds(
        &self,
        _account: &GatewayAccount,
        _charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError> {
        Err(GatewayError::Terminal(
            "epdq 3DS continuation is handled on the hosted page".to_string(),
        ))
    }

    async fn capture(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError> {
        let pay_id = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no pay id".to_string()))?;
        self.post(
            &format!("/payments/{pay_id}/maintenance"),
            json!({ "operation": "SAS", "amount": charge.amount }),
        )
        .await?;
        Ok(CaptureResponse {
            status: CaptureStatus::Pending,
        })
    }

    async fn refund(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
        refund: &Refund,
    ) -> Result<RefundResponse, GatewayError> {
        let pay_id = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no pay id".to_string()))?;
        let v = self
            .post(
                &format!("/payments/{pay_id}/maintenance"),
                json!({ "operation": "RFD", "amount": refund.amount }),
            )
            .await?;
        let reference = v
            .get("payIdSub")
            .and_then(|sub| sub.as_str())
            .map(|sub| format!("{pay_id}/{sub}"));
        Ok(RefundResponse {
            status: RefundSubmitStatus::Pending,
            reference,
        })
    }

    async fn cancel(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CancelResponse, GatewayError> {
        let pay_id = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no pay id".to_string()))?;
        self.post(
            &format!("/payments/{pay_id}/maintenance"),
            json!({ "operation": "DES" }),
        )
        .await?;
        Ok(CancelResponse {
            status: CancelStatus::Cancelled,
        })
    }
}

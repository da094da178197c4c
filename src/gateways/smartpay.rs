use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{AuthCardDetails, Charge};
use crate::domain::refund::Refund;
use crate::gateways::{
    AuthoriseResponse, AuthoriseStatus, CancelResponse, CancelStatus, CaptureResponse,
    CaptureStatus, GatewayClient, GatewayError, RefundResponse, RefundSubmitStatus,
};
use serde_json::json;

/// Smartpay client. The PSP assigns its own reference per operation:
/// authorisation stores the auth pspReference on the charge, and a refund's
/// notification carries the refund's own pspReference, not the original
/// transaction id.
pub struct SmartpayGateway {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl SmartpayGateway {
    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                r.json().await.map_err(|e| GatewayError::Retryable(e.to_string()))
            }
            Ok(r) if r.status().is_server_error() => Err(GatewayError::Retryable(format!(
                "smartpay returned {}",
                r.status()
            ))),
            Ok(r) => Err(GatewayError::Terminal(format!(
                "smartpay returned {}",
                r.status()
            ))),
            Err(e) if e.is_timeout() => Err(GatewayError::Retryable("smartpay timeout".to_string())),
            Err(e) => Err(GatewayError::Retryable(e.to_string())),
        }
    }

    fn psp_reference(v: &serde_json::Value) -> Option<String> {
        v.get("pspReference")
            .and_then(|r| r.as_str())
            .map(ToString::to_string)
    }
}

#[async_trait::async_trait]
impl GatewayClient for SmartpayGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Smartpay
    }

    async fn authorise(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
        card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let body = json!({
            "reference": charge.external_id,
            "amount": { "value": charge.amount },
            "card": {
                "number": card.card_number,
                "holderName": card.cardholder_name,
                "cvc": card.cvc,
                "expiryDate": card.expiry_date,
            },
        });
        let v = self.post("/pal/authorise", body).await?;
        let status = match v.get("resultCode").and_then(|c| c.as_str()) {
            Some("Authorised") => AuthoriseStatus::Authorised,
            Some("Refused") => AuthoriseStatus::Rejected,
            Some("RedirectShopper") => AuthoriseStatus::Requires3ds,
            Some("Received") => AuthoriseStatus::Submitted,
            _ => AuthoriseStatus::Error,
        };
        Ok(AuthoriseResponse {
            status,
            transaction_id: Self::psp_reference(&v),
            session_id: None,
        })
    }

    async fn authorise_3ds(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let reference = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no psp reference".to_string()))?;
        let v = self
            .post("/pal/authorise3d", json!({ "pspReference": reference }))
            .await?;
        let status = match v.get("resultCode").and_then(|c| c.as_str()) {
            Some("Authorised") => AuthoriseStatus::Authorised,
            Some("Refused") => AuthoriseStatus::Rejected,
            _ => AuthoriseStatus::Error,
        };
        Ok(AuthoriseResponse {
            status,
            transaction_id: Self::psp_reference(&v).or_else(|| Some(reference.to_string())),
            session_id: None,
        })
    }

    async fn capture(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError> {
        let reference = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no psp reference".to_string()))?;
        self.post(
            "/pal/capture",
            json!({ "originalReference": reference, "amount": { "value": charge.amount } }),
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
        let reference = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no psp reference".to_string()))?;
        let v = self
            .post(
                "/pal/refund",
                json!({ "originalReference": reference, "amount": { "value": refund.amount } }),
            )
            .await?;
        Ok(RefundResponse {
            status: RefundSubmitStatus::Pending,
            reference: Self::psp_reference(&v),
        })
    }

    async fn cancel(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CancelResponse, GatewayError> {
        let reference = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no psp reference".to_string()))?;
        self.post("/pal/cancel", json!({ "originalReference": reference }))
            .await?;
        Ok(CancelResponse {
            status: CancelStatus::Submitted,
        })
    }
}

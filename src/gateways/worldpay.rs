use crate::domain::account::{GatewayAccount, PaymentProvider};
use crate::domain::charge::{AuthCardDetails, Charge};
use crate::domain::refund::Refund;
use crate::gateways::{
    AuthoriseResponse, AuthoriseStatus, CancelResponse, CancelStatus, CaptureResponse,
    CaptureStatus, GatewayClient, GatewayError, RefundResponse, RefundSubmitStatus,
};
use serde_json::json;

/// Worldpay order API client. References are a single opaque order code,
/// assigned here at authorisation and reused for capture/refund/cancel.
pub struct WorldpayGateway {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl WorldpayGateway {
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
                "worldpay returned {}",
                r.status()
            ))),
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                Err(GatewayError::Terminal(format!(
                    "worldpay returned {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )))
            }
            Err(e) if e.is_timeout() => Err(GatewayError::Retryable("worldpay timeout".to_string())),
            Err(e) => Err(GatewayError::Retryable(e.to_string())),
        }
    }

    fn auth_response(v: &serde_json::Value) -> AuthoriseResponse {
        let order_code = v
            .get("orderCode")
            .and_then(|c| c.as_str())
            .map(ToString::to_string);
        let status = match v.get("lastEvent").and_then(|e| e.as_str()) {
            Some("AUTHORISED") => AuthoriseStatus::Authorised,
            Some("REFUSED") => AuthoriseStatus::Rejected,
            Some("CHALLENGE_REQUIRED") => AuthoriseStatus::Requires3ds,
            Some("SENT_FOR_AUTHORISATION") => AuthoriseStatus::Submitted,
            _ => AuthoriseStatus::Error,
        };
        AuthoriseResponse {
            status,
            transaction_id: order_code,
            session_id: None,
        }
    }
}

#[async_trait::async_trait]
impl GatewayClient for WorldpayGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Worldpay
    }

    async fn authorise(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
        card: &AuthCardDetails,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let body = json!({
            "merchantReference": charge.external_id,
            "amount": charge.amount,
            "cardNumber": card.card_number,
            "cardholderName": card.cardholder_name,
            "cvc": card.cvc,
            "expiryDate": card.expiry_date,
        });
        let v = self.post("/orders", body).await?;
        Ok(Self::auth_response(&v))
    }

    async fn authorise_3ds(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<AuthoriseResponse, GatewayError> {
        let order_code = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no order code".to_string()))?;
        let v = self
            .post(&format!("/orders/{order_code}/3ds"), json!({}))
            .await?;
        Ok(Self::auth_response(&v))
    }

    async fn capture(
        &self,
        _account: &GatewayAccount,
        charge: &Charge,
    ) -> Result<CaptureResponse, GatewayError> {
        let order_code = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no order code".to_string()))?;
        self.post(
            &format!("/orders/{order_code}/capture"),
            json!({ "amount": charge.amount }),
        )
        .await?;
        // Worldpay acknowledges the request; settlement is confirmed by a
        // CAPTURED notification.
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
        let order_code = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no order code".to_string()))?;
        let v = self
            .post(
                &format!("/orders/{order_code}/refund"),
                json!({ "amount": refund.amount, "reference": refund.external_id }),
            )
            .await?;
        let reference = v
            .get("refundReference")
            .and_then(|r| r.as_str())
            .map(ToString::to_string)
            .or_else(|| Some(refund.external_id.clone()));
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
        let order_code = charge
            .gateway_transaction_id
            .as_deref()
            .ok_or_else(|| GatewayError::Terminal("charge has no order code".to_string()))?;
        self.post(&format!("/orders/{order_code}/cancel"), json!({}))
            .await?;
        Ok(CancelResponse {
            status: CancelStatus::Cancelled,
        })
    }
}

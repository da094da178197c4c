use serde::{Deserialize, Serialize};

/// Payment provider behind a gateway account. Selects the transition-table
/// variant, the status-code map and the reference scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Sandbox,
    Worldpay,
    Smartpay,
    Epdq,
}

/// Transition-rule profile. Synchronous gateways resolve authorisation and
/// capture inside the call itself, so their table skips the `*_SUBMITTED`
/// intermediate states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayVariant {
    Synchronous,
    Asynchronous,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Sandbox => "SANDBOX",
            PaymentProvider::Worldpay => "WORLDPAY",
            PaymentProvider::Smartpay => "SMARTPAY",
            PaymentProvider::Epdq => "EPDQ",
        }
    }

    pub fn from_str(s: &str) -> Option<PaymentProvider> {
        match s.to_uppercase().as_str() {
            "SANDBOX" => Some(PaymentProvider::Sandbox),
            "WORLDPAY" => Some(PaymentProvider::Worldpay),
            "SMARTPAY" => Some(PaymentProvider::Smartpay),
            "EPDQ" => Some(PaymentProvider::Epdq),
            _ => None,
        }
    }

    pub fn variant(&self) -> GatewayVariant {
        match self {
            PaymentProvider::Sandbox => GatewayVariant::Synchronous,
            PaymentProvider::Worldpay | PaymentProvider::Smartpay | PaymentProvider::Epdq => {
                GatewayVariant::Asynchronous
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Test,
    Live,
}

/// Merchant account owning charges. Read-only to the lifecycle core.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayAccount {
    pub id: i64,
    pub payment_provider: PaymentProvider,
    pub account_type: AccountType,
    pub service_name: String,
}

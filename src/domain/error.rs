use thiserror::Error;

/// Failures surfaced to API callers. Background-engine and notification
/// errors never reach here; they stay observability events.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("charge not found: {0}")]
    ChargeNotFound(String),

    #[error("refund not found: {0}")]
    RefundNotFound(String),

    #[error("gateway account not found: {0}")]
    AccountNotFound(i64),

    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("charge was updated by another actor")]
    Conflict,

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ConnectorError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            ConnectorError::ChargeNotFound(_)
            | ConnectorError::RefundNotFound(_)
            | ConnectorError::AccountNotFound(_) => 404,
            ConnectorError::IllegalTransition { .. } => 400,
            ConnectorError::Conflict => 409,
            ConnectorError::Invalid(_) => 422,
            ConnectorError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConnectorError::ChargeNotFound(_) => "CHARGE_NOT_FOUND",
            ConnectorError::RefundNotFound(_) => "REFUND_NOT_FOUND",
            ConnectorError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            ConnectorError::IllegalTransition { .. } => "ILLEGAL_STATE_TRANSITION",
            ConnectorError::Conflict => "CONFLICT",
            ConnectorError::Invalid(_) => "INVALID_REQUEST",
            ConnectorError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

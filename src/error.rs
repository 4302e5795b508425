use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Terminal failures of one orchestration call. None of these are
/// retried internally; the ledger is never mutated on a failure path.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("plan not found")]
    PlanNotFound,
    #[error("unrecognized billing term: {0}")]
    InvalidTerm(String),
    #[error("plan does not qualify for free signup")]
    PlanNotFree,
    #[error("no payment gateway is configured")]
    NoGatewayConfigured,
    #[error("{0} gateway is not configured")]
    GatewayNotConfigured(&'static str),
    #[error("charge failed: {0}")]
    ChargeFailed(String),
    #[error("checkout initiation failed: {0}")]
    InitiationFailed(String),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl PaymentError {
    /// Stable discriminant surfaced in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "validation",
            PaymentError::PlanNotFound => "not_found",
            PaymentError::InvalidTerm(_) => "invalid_term",
            PaymentError::PlanNotFree => "plan_not_free",
            PaymentError::NoGatewayConfigured => "no_gateway_configured",
            PaymentError::GatewayNotConfigured(_) => "gateway_not_configured",
            PaymentError::ChargeFailed(_) => "charge_failed",
            PaymentError::InitiationFailed(_) => "initiation_failed",
            PaymentError::Storage(_) => "storage",
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = match self {
            PaymentError::Validation(_)
            | PaymentError::InvalidTerm(_)
            | PaymentError::PlanNotFree => StatusCode::BAD_REQUEST,
            PaymentError::PlanNotFound => StatusCode::NOT_FOUND,
            PaymentError::NoGatewayConfigured | PaymentError::GatewayNotConfigured(_) => {
                StatusCode::CONFLICT
            }
            PaymentError::ChargeFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::InitiationFailed(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(?self);
        let message = match &self {
            PaymentError::Storage(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        (
            status,
            Json(json!({ "kind": self.kind(), "message": message })),
        )
            .into_response()
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, PaymentResult};
use crate::models::{GatewaySummary, Plan, TenantContext, Term, WorkspaceSubscription};
use crate::orchestrator::PaymentOrchestrator;

/// key: billing-api -> rest endpoints

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub tenant: TenantContext,
    pub id: i64,
    pub term: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubscribeResponse {
    Subscribed {
        subscription: WorkspaceSubscription,
    },
    CheckoutRequired {
        plan: Plan,
        amount: f64,
        term: Term,
        gateways: Vec<GatewaySummary>,
    },
}

/// `term=free_plan` attempts the free signup; a plan that does not
/// qualify falls through to the paid checkout context.
pub async fn subscribe(
    Extension(orchestrator): Extension<Arc<PaymentOrchestrator>>,
    Json(payload): Json<SubscribeRequest>,
) -> PaymentResult<Json<SubscribeResponse>> {
    if payload.term.trim().is_empty() {
        return Err(PaymentError::Validation("term is required".to_string()));
    }

    if payload.term == "free_plan" {
        match orchestrator.subscribe_free(&payload.tenant, payload.id).await {
            Ok(subscription) => {
                return Ok(Json(SubscribeResponse::Subscribed { subscription }))
            }
            Err(PaymentError::PlanNotFree) => {}
            Err(err) => return Err(err),
        }
    }

    let context = orchestrator
        .initiate_paid_flow(&payload.tenant, payload.id, &payload.term)
        .await?;
    Ok(Json(SubscribeResponse::CheckoutRequired {
        plan: context.plan,
        amount: context.amount,
        term: context.term,
        gateways: context.gateways,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub tenant: TenantContext,
    pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CancelResponse {
    Unsubscribed {
        subscription: WorkspaceSubscription,
    },
    Unchanged,
}

pub async fn cancel_subscription(
    Extension(orchestrator): Extension<Arc<PaymentOrchestrator>>,
    Json(payload): Json<CancelRequest>,
) -> PaymentResult<Json<CancelResponse>> {
    match orchestrator.cancel(&payload.tenant, payload.id).await? {
        Some(subscription) => Ok(Json(CancelResponse::Unsubscribed { subscription })),
        None => Ok(Json(CancelResponse::Unchanged)),
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeChargeRequest {
    pub tenant: TenantContext,
    pub plan_id: i64,
    pub term: String,
    pub token_id: String,
}

#[derive(Debug, Serialize)]
pub struct StripeChargeResponse {
    pub status: &'static str,
    pub customer_id: String,
    pub charge_id: String,
    pub subscription: WorkspaceSubscription,
}

pub async fn charge_stripe(
    Extension(orchestrator): Extension<Arc<PaymentOrchestrator>>,
    Json(payload): Json<StripeChargeRequest>,
) -> PaymentResult<Json<StripeChargeResponse>> {
    let receipt = orchestrator
        .charge_direct(
            &payload.tenant,
            payload.plan_id,
            &payload.term,
            &payload.token_id,
        )
        .await?;
    Ok(Json(StripeChargeResponse {
        status: "subscribed",
        customer_id: receipt.customer_id,
        charge_id: receipt.charge_id,
        subscription: receipt.subscription,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PaystackCheckoutRequest {
    pub tenant: TenantContext,
    pub plan_id: i64,
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct PaystackCheckoutResponse {
    pub authorization_url: String,
}

pub async fn initiate_paystack(
    Extension(orchestrator): Extension<Arc<PaymentOrchestrator>>,
    Json(payload): Json<PaystackCheckoutRequest>,
) -> PaymentResult<Json<PaystackCheckoutResponse>> {
    let authorization_url = orchestrator
        .initiate_redirect(&payload.tenant, payload.plan_id, &payload.term)
        .await?;
    Ok(Json(PaystackCheckoutResponse { authorization_url }))
}

pub async fn get_subscription(
    Extension(orchestrator): Extension<Arc<PaymentOrchestrator>>,
    Path(workspace_id): Path<i64>,
) -> PaymentResult<Json<WorkspaceSubscription>> {
    Ok(Json(orchestrator.subscription(workspace_id).await?))
}

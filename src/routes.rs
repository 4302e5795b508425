use axum::{
    routing::{get, post},
    Router,
};

use crate::api;

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/billing/subscribe", post(api::subscribe))
        .route("/api/billing/cancel", post(api::cancel_subscription))
        .route("/api/billing/charge/stripe", post(api::charge_stripe))
        .route(
            "/api/billing/checkout/paystack",
            post(api::initiate_paystack),
        )
        .route(
            "/api/billing/subscription/:workspace_id",
            get(api::get_subscription),
        )
}

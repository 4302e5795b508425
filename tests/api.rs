use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::{Extension, Router};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use billing_backend::models::{Gateway, Plan, ProviderKind};
use billing_backend::notifications::{start_notification_worker, LogNotificationSink};
use billing_backend::orchestrator::PaymentOrchestrator;
use billing_backend::providers::{PaystackRedirectGateway, StripeDirectGateway};
use billing_backend::routes::api_routes;
use billing_backend::store::InMemoryStore;

fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_plan(Plan {
        id: 1,
        name: "Pro".to_string(),
        price_monthly: 10.0,
        price_yearly: 100.0,
    });
    store.insert_plan(Plan {
        id: 2,
        name: "Community".to_string(),
        price_monthly: 29.0,
        price_yearly: 0.0,
    });
    store.insert_plan(Plan {
        id: 3,
        name: "Blank".to_string(),
        price_monthly: 0.0,
        price_yearly: 0.0,
    });
    store.insert_gateway(Gateway {
        id: 1,
        provider: ProviderKind::Stripe,
        secret_key: "sk_live_secret".to_string(),
        public_key: Some("pk_live_public".to_string()),
        monthly_plan_code: None,
        yearly_plan_code: None,
        active: true,
    });
    store
}

/// The provider executors point at an unroutable address; none of the
/// flows exercised here are allowed to reach a provider.
fn app(store: Arc<InMemoryStore>) -> Router {
    let notifications = start_notification_worker(Arc::new(LogNotificationSink));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(StripeDirectGateway::new(
            "http://127.0.0.1:9",
            "usd",
            "Billing Backend",
            Duration::from_millis(100),
        )),
        Arc::new(PaystackRedirectGateway::new(
            "http://127.0.0.1:9",
            Duration::from_millis(100),
        )),
        notifications,
        "https://app.example.com",
    ));
    Router::new().merge(api_routes()).layer(Extension(orchestrator))
}

fn tenant_body() -> Value {
    json!({
        "workspace_id": 7,
        "payer": {
            "user_id": 11,
            "email": "owner@example.com",
            "first_name": "Ada",
            "last_name": "Lovelace"
        }
    })
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn free_plan_term_subscribes_directly() {
    let app = app(seeded_store());
    let response = app
        .oneshot(post(
            "/api/billing/subscribe",
            json!({ "tenant": tenant_body(), "id": 2, "term": "free_plan" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "subscribed");
    assert_eq!(body["subscription"]["price"], 0.0);
    assert_eq!(body["subscription"]["plan_id"], 2);
}

#[tokio::test]
async fn non_qualifying_plan_falls_through_to_term_validation() {
    // A zero/zero plan fails the free predicate and continues into the
    // paid flow, where the literal term "free_plan" is unrecognized.
    let app = app(seeded_store());
    let response = app
        .oneshot(post(
            "/api/billing/subscribe",
            json!({ "tenant": tenant_body(), "id": 3, "term": "free_plan" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "invalid_term");
}

#[tokio::test]
async fn paid_plan_returns_checkout_context_without_secrets() {
    let app = app(seeded_store());
    let response = app
        .oneshot(post(
            "/api/billing/subscribe",
            json!({ "tenant": tenant_body(), "id": 1, "term": "monthly" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let raw = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!raw.contains("sk_live_secret"));

    let body: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["status"], "checkout_required");
    assert_eq!(body["amount"], 10.0);
    assert_eq!(body["term"], "monthly");
    assert_eq!(body["gateways"][0]["provider"], "stripe");
    assert_eq!(body["gateways"][0]["public_key"], "pk_live_public");
}

#[tokio::test]
async fn unknown_plan_is_not_found() {
    let app = app(seeded_store());
    let response = app
        .oneshot(post(
            "/api/billing/subscribe",
            json!({ "tenant": tenant_body(), "id": 999, "term": "monthly" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn cancel_with_unknown_plan_reports_unchanged() {
    let app = app(seeded_store());
    let response = app
        .oneshot(post(
            "/api/billing/cancel",
            json!({ "tenant": tenant_body(), "id": 999 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unchanged");
}

#[tokio::test]
async fn subscription_read_returns_the_default_state() {
    let app = app(seeded_store());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/billing/subscription/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["workspace_id"], 7);
    assert_eq!(body["subscribed"], false);
    assert_eq!(body["trial"], true);
}

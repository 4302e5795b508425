use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{provider_client, RedirectInitiateExecutor};
use crate::error::PaymentError;
use crate::models::{Gateway, Payer, Plan, Term};

/// key: provider-paystack -> hosted checkout adapter
pub struct PaystackRedirectGateway {
    base: String,
    client: reqwest::Client,
}

impl PaystackRedirectGateway {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: provider_client(timeout),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<InitializeData>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

/// The initialize call quotes the monthly price in minor units for
/// both terms; the term-selected plan code governs the recurring
/// amount on the provider side.
fn initialize_amount(plan: &Plan) -> i64 {
    (plan.price_monthly * 100.0).round() as i64
}

#[async_trait]
impl RedirectInitiateExecutor for PaystackRedirectGateway {
    async fn initiate(
        &self,
        gateway: &Gateway,
        payer: &Payer,
        plan: &Plan,
        term: Term,
        callback_url: &str,
    ) -> Result<String, PaymentError> {
        let plan_code = gateway.plan_code_for(term).ok_or_else(|| {
            PaymentError::InitiationFailed(format!(
                "gateway has no {} plan code configured",
                term.as_str()
            ))
        })?;

        let amount = initialize_amount(plan).to_string();
        let fields = [
            ("email", payer.email.as_str()),
            ("amount", amount.as_str()),
            ("plan", plan_code),
            ("callback_url", callback_url),
        ];
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base))
            .bearer_auth(&gateway.secret_key)
            .form(&fields)
            .send()
            .await
            .map_err(|err| PaymentError::InitiationFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PaymentError::InitiationFailed(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: InitializeResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::InitiationFailed(err.to_string()))?;
        if !body.status {
            return Err(PaymentError::InitiationFailed(
                body.message
                    .unwrap_or_else(|| "provider rejected the initialization".to_string()),
            ));
        }
        let data = body.data.ok_or_else(|| {
            PaymentError::InitiationFailed("provider response missing authorization url".to_string())
        })?;

        info!(plan = %plan.name, term = %term.as_str(), "hosted checkout initialized");
        Ok(data.authorization_url)
    }
}

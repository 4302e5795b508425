use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{provider_client, ChargeReceipt, DirectChargeExecutor, DirectChargeRequest};
use crate::error::PaymentError;
use crate::models::{Gateway, NewPaymentMethod, Payer};
use crate::store::SubscriptionLedger;

/// Longest statement descriptor the card networks accept.
pub const STATEMENT_DESCRIPTOR_MAX: usize = 22;

/// key: provider-stripe -> direct charge adapter
///
/// Credentials come from the gateway row on every call; only the API
/// base, currency and display name are fixed at construction.
pub struct StripeDirectGateway {
    base: String,
    currency: String,
    statement_name: String,
    client: reqwest::Client,
}

impl StripeDirectGateway {
    pub fn new(
        base: impl Into<String>,
        currency: impl Into<String>,
        statement_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            currency: currency.into(),
            statement_name: statement_name.into(),
            client: provider_client(timeout),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Minor-unit conversion: the amount is truncated to whole currency
/// units before multiplying, so `10.55` charges `1000`, not `1055`.
fn minor_units(amount: f64) -> i64 {
    (amount as i64) * 100
}

fn statement_descriptor(name: &str) -> String {
    name.chars().take(STATEMENT_DESCRIPTOR_MAX).collect()
}

async fn failure_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ProviderErrorBody>().await {
        Ok(body) => body
            .error
            .and_then(|detail| detail.message)
            .unwrap_or_else(|| format!("provider returned {status}")),
        Err(_) => format!("provider returned {status}"),
    }
}

#[async_trait]
impl DirectChargeExecutor for StripeDirectGateway {
    async fn charge(
        &self,
        ledger: &dyn SubscriptionLedger,
        gateway: &Gateway,
        payer: &Payer,
        request: DirectChargeRequest,
    ) -> Result<ChargeReceipt, PaymentError> {
        let name = payer.full_name();
        let customer_form = [
            ("source", request.token.as_str()),
            ("email", payer.email.as_str()),
            ("name", name.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}/v1/customers", self.base))
            .bearer_auth(&gateway.secret_key)
            .form(&customer_form)
            .send()
            .await
            .map_err(|err| PaymentError::ChargeFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PaymentError::ChargeFailed(failure_message(response).await));
        }
        let customer: CustomerResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::ChargeFailed(err.to_string()))?;

        // The saved method survives even if the charge below fails;
        // callers retry by submitting a fresh attempt.
        ledger
            .store_payment_method(NewPaymentMethod {
                gateway_id: gateway.id,
                user_id: payer.user_id,
                token: customer.id.clone(),
            })
            .await?;

        let amount = minor_units(request.amount).to_string();
        let descriptor = statement_descriptor(&self.statement_name);
        let charge_form = [
            ("amount", amount.as_str()),
            ("currency", self.currency.as_str()),
            ("customer", customer.id.as_str()),
            ("description", request.plan_label.as_str()),
            ("statement_descriptor", descriptor.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}/v1/charges", self.base))
            .bearer_auth(&gateway.secret_key)
            .form(&charge_form)
            .send()
            .await
            .map_err(|err| PaymentError::ChargeFailed(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PaymentError::ChargeFailed(failure_message(response).await));
        }
        let charge: ChargeResponse = response
            .json()
            .await
            .map_err(|err| PaymentError::ChargeFailed(err.to_string()))?;

        info!(
            customer = %customer.id,
            charge = %charge.id,
            "direct charge settled"
        );
        Ok(ChargeReceipt {
            customer_id: customer.id,
            charge_id: charge.id,
        })
    }
}

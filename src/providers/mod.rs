pub mod paystack;
pub mod stripe;

pub use paystack::PaystackRedirectGateway;
pub use stripe::StripeDirectGateway;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::PaymentError;
use crate::models::{Gateway, Payer, Plan, Term};
use crate::store::SubscriptionLedger;

/// Ephemeral context for one direct-charge attempt. Lives for the
/// duration of a single orchestration call and is never persisted.
#[derive(Debug, Clone)]
pub struct DirectChargeRequest {
    /// Amount in major currency units.
    pub amount: f64,
    /// Plan name, used as the provider-side charge description.
    pub plan_label: String,
    /// One-time payment token collected from the payer.
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub customer_id: String,
    pub charge_id: String,
}

/// key: charge-executor-direct -> server-side money movement
///
/// Implementations must create the provider-side customer first,
/// persist the resulting payment method through the ledger handed in,
/// and only then submit the charge. A charge failure after the method
/// was stored leaves the method behind; the subscription ledger itself
/// is never touched here.
#[async_trait]
pub trait DirectChargeExecutor: Send + Sync {
    async fn charge(
        &self,
        ledger: &dyn SubscriptionLedger,
        gateway: &Gateway,
        payer: &Payer,
        request: DirectChargeRequest,
    ) -> Result<ChargeReceipt, PaymentError>;
}

/// key: charge-executor-redirect -> hosted checkout handoff
///
/// Returns the provider's authorization URL. Never mutates the ledger;
/// the activation happens on the later confirmation callback.
#[async_trait]
pub trait RedirectInitiateExecutor: Send + Sync {
    async fn initiate(
        &self,
        gateway: &Gateway,
        payer: &Payer,
        plan: &Plan,
        term: Term,
        callback_url: &str,
    ) -> Result<String, PaymentError>;
}

pub(crate) fn provider_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("client build")
}

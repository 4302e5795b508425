pub mod memory;
pub mod pg;

pub use memory::InMemoryStore;
pub use pg::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    Gateway, NewPaymentMethod, PaidActivation, Plan, ProviderKind, StoredPaymentMethod,
    WorkspaceSubscription,
};

/// key: billing-catalog -> plan resolution
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>>;
}

/// key: billing-gateway-registry -> configured providers
#[async_trait]
pub trait GatewayRegistry: Send + Sync {
    /// The single honored gateway of a provider kind, if one is active.
    async fn active_gateway(&self, provider: ProviderKind) -> Result<Option<Gateway>>;

    async fn active_gateways(&self) -> Result<Vec<Gateway>>;
}

/// key: billing-ledger -> transactional subscription state
///
/// Every mutation is one atomic write for its workspace;
/// last-writer-wins, no history is kept.
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Current state, or the implicit unsubscribed default for a
    /// workspace the ledger has never written.
    async fn subscription(&self, workspace_id: i64) -> Result<WorkspaceSubscription>;

    async fn activate(
        &self,
        workspace_id: i64,
        activation: &PaidActivation,
    ) -> Result<WorkspaceSubscription>;

    /// Free-plan activation: price drops to zero and the trial ends,
    /// but any previous term and renewal date are left as they were.
    async fn activate_free(
        &self,
        workspace_id: i64,
        plan_id: i64,
        start_date: NaiveDate,
    ) -> Result<WorkspaceSubscription>;

    /// Clears the subscribed flag and the plan reference only. Term,
    /// price and dates survive deactivation.
    async fn deactivate(&self, workspace_id: i64) -> Result<WorkspaceSubscription>;

    async fn store_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<StoredPaymentMethod>;

    async fn payment_methods(&self, user_id: i64) -> Result<Vec<StoredPaymentMethod>>;
}

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{GatewayRegistry, PlanCatalog, SubscriptionLedger};
use crate::models::{
    Gateway, NewPaymentMethod, PaidActivation, Plan, ProviderKind, StoredPaymentMethod,
    WorkspaceSubscription,
};

/// key: billing-store-memory -> database-less port implementation
///
/// Mirrors the Postgres store's semantics so orchestration tests
/// exercise the same contracts. Also usable as a dev mode.
#[derive(Default)]
pub struct InMemoryStore {
    plans: DashMap<i64, Plan>,
    gateways: DashMap<i64, Gateway>,
    workspaces: DashMap<i64, WorkspaceSubscription>,
    payment_methods: Mutex<Vec<StoredPaymentMethod>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_plan(&self, plan: Plan) {
        self.plans.insert(plan.id, plan);
    }

    pub fn insert_gateway(&self, gateway: Gateway) {
        self.gateways.insert(gateway.id, gateway);
    }
}

#[async_trait]
impl PlanCatalog for InMemoryStore {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>> {
        Ok(self.plans.get(&plan_id).map(|entry| entry.clone()))
    }
}

#[async_trait]
impl GatewayRegistry for InMemoryStore {
    async fn active_gateway(&self, provider: ProviderKind) -> Result<Option<Gateway>> {
        let mut matches: Vec<Gateway> = self
            .gateways
            .iter()
            .filter(|entry| entry.active && entry.provider == provider)
            .map(|entry| entry.clone())
            .collect();
        matches.sort_by_key(|gateway| gateway.id);
        Ok(matches.into_iter().next())
    }

    async fn active_gateways(&self) -> Result<Vec<Gateway>> {
        let mut all: Vec<Gateway> = self
            .gateways
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.clone())
            .collect();
        all.sort_by_key(|gateway| gateway.id);
        Ok(all)
    }
}

#[async_trait]
impl SubscriptionLedger for InMemoryStore {
    async fn subscription(&self, workspace_id: i64) -> Result<WorkspaceSubscription> {
        Ok(self
            .workspaces
            .get(&workspace_id)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| WorkspaceSubscription::empty(workspace_id)))
    }

    async fn activate(
        &self,
        workspace_id: i64,
        activation: &PaidActivation,
    ) -> Result<WorkspaceSubscription> {
        let mut entry = self
            .workspaces
            .entry(workspace_id)
            .or_insert_with(|| WorkspaceSubscription::empty(workspace_id));
        let state = entry.value_mut();
        state.subscribed = true;
        state.plan_id = Some(activation.plan_id);
        state.term = Some(activation.term);
        state.price = activation.price;
        state.trial = false;
        state.subscription_start_date = Some(activation.start_date);
        state.next_renewal_date = Some(activation.next_renewal_date);
        Ok(state.clone())
    }

    async fn activate_free(
        &self,
        workspace_id: i64,
        plan_id: i64,
        start_date: NaiveDate,
    ) -> Result<WorkspaceSubscription> {
        let mut entry = self
            .workspaces
            .entry(workspace_id)
            .or_insert_with(|| WorkspaceSubscription::empty(workspace_id));
        let state = entry.value_mut();
        state.subscribed = true;
        state.plan_id = Some(plan_id);
        state.price = 0.0;
        state.trial = false;
        state.subscription_start_date = Some(start_date);
        Ok(state.clone())
    }

    async fn deactivate(&self, workspace_id: i64) -> Result<WorkspaceSubscription> {
        let mut entry = self
            .workspaces
            .entry(workspace_id)
            .or_insert_with(|| WorkspaceSubscription::empty(workspace_id));
        let state = entry.value_mut();
        state.subscribed = false;
        state.plan_id = None;
        Ok(state.clone())
    }

    async fn store_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<StoredPaymentMethod> {
        let stored = StoredPaymentMethod {
            id: Uuid::new_v4(),
            gateway_id: method.gateway_id,
            user_id: method.user_id,
            token: method.token,
        };
        self.payment_methods
            .lock()
            .expect("payment method store poisoned")
            .push(stored.clone());
        Ok(stored)
    }

    async fn payment_methods(&self, user_id: i64) -> Result<Vec<StoredPaymentMethod>> {
        Ok(self
            .payment_methods
            .lock()
            .expect("payment method store poisoned")
            .iter()
            .filter(|method| method.user_id == user_id)
            .cloned()
            .collect())
    }
}

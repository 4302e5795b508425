use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{PaymentError, PaymentResult};
use crate::models::{
    Gateway, GatewaySummary, PaidActivation, Plan, ProviderKind, TenantContext, Term,
    WorkspaceSubscription,
};
use crate::notifications::{NotificationHandle, SubscriptionActivated};
use crate::providers::{
    DirectChargeExecutor, DirectChargeRequest, RedirectInitiateExecutor,
};
use crate::store::{GatewayRegistry, PlanCatalog, SubscriptionLedger};

/// key: payment-orchestrator -> charge lifecycle
///
/// One orchestration call is a strict sequence: resolve plan and
/// gateway, move money, write the ledger, fire the notification.
/// Failure at any step aborts everything after it; the ledger is only
/// written once the charge has settled.
pub struct PaymentOrchestrator {
    catalog: Arc<dyn PlanCatalog>,
    gateways: Arc<dyn GatewayRegistry>,
    ledger: Arc<dyn SubscriptionLedger>,
    direct: Arc<dyn DirectChargeExecutor>,
    redirect: Arc<dyn RedirectInitiateExecutor>,
    notifications: NotificationHandle,
    app_url: String,
    // Same-tenant calls serialize around the charge + ledger write so a
    // stale request cannot interleave its write with a charge in flight.
    tenant_locks: DashMap<i64, Arc<Mutex<()>>>,
}

/// Presentation context for the checkout page: nothing has been
/// charged or written yet.
#[derive(Debug, Clone, Serialize)]
pub struct PaidFlowContext {
    pub plan: Plan,
    pub term: Term,
    pub amount: f64,
    pub gateways: Vec<GatewaySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectChargeReceipt {
    pub customer_id: String,
    pub charge_id: String,
    pub subscription: WorkspaceSubscription,
}

impl PaymentOrchestrator {
    pub fn new(
        catalog: Arc<dyn PlanCatalog>,
        gateways: Arc<dyn GatewayRegistry>,
        ledger: Arc<dyn SubscriptionLedger>,
        direct: Arc<dyn DirectChargeExecutor>,
        redirect: Arc<dyn RedirectInitiateExecutor>,
        notifications: NotificationHandle,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            gateways,
            ledger,
            direct,
            redirect,
            notifications,
            app_url: app_url.into().trim_end_matches('/').to_string(),
            tenant_locks: DashMap::new(),
        }
    }

    pub async fn subscription(&self, workspace_id: i64) -> PaymentResult<WorkspaceSubscription> {
        Ok(self.ledger.subscription(workspace_id).await?)
    }

    pub async fn subscribe_free(
        &self,
        tenant: &TenantContext,
        plan_id: i64,
    ) -> PaymentResult<WorkspaceSubscription> {
        let plan = self.resolve_plan(plan_id).await?;
        if !plan.qualifies_for_free_signup() {
            return Err(PaymentError::PlanNotFree);
        }

        let lock = self.tenant_lock(tenant.workspace_id);
        let _guard = lock.lock().await;
        let state = self
            .ledger
            .activate_free(tenant.workspace_id, plan.id, today())
            .await?;
        info!(
            workspace_id = tenant.workspace_id,
            plan = %plan.name,
            "workspace subscribed to free plan"
        );
        Ok(state)
    }

    /// Resolves everything the checkout page needs. The gateway check
    /// runs before the term is parsed, matching the subscribe flow's
    /// original ordering.
    pub async fn initiate_paid_flow(
        &self,
        _tenant: &TenantContext,
        plan_id: i64,
        term: &str,
    ) -> PaymentResult<PaidFlowContext> {
        let plan = self.resolve_plan(plan_id).await?;
        let gateways = self.gateways.active_gateways().await?;
        if gateways.is_empty() {
            return Err(PaymentError::NoGatewayConfigured);
        }
        let term = Term::parse(term)?;
        let amount = plan.amount_for(term);
        Ok(PaidFlowContext {
            gateways: gateways.iter().map(Gateway::summary).collect(),
            plan,
            term,
            amount,
        })
    }

    pub async fn charge_direct(
        &self,
        tenant: &TenantContext,
        plan_id: i64,
        term: &str,
        payment_token: &str,
    ) -> PaymentResult<DirectChargeReceipt> {
        if payment_token.trim().is_empty() {
            return Err(PaymentError::Validation("token_id is required".to_string()));
        }
        let plan = self.resolve_plan(plan_id).await?;
        let term = Term::parse(term)?;
        let amount = plan.amount_for(term);
        let start_date = today();
        let gateway = self
            .gateways
            .active_gateway(ProviderKind::Stripe)
            .await?
            .ok_or(PaymentError::GatewayNotConfigured("stripe"))?;

        let lock = self.tenant_lock(tenant.workspace_id);
        let _guard = lock.lock().await;

        let receipt = self
            .direct
            .charge(
                self.ledger.as_ref(),
                &gateway,
                &tenant.payer,
                DirectChargeRequest {
                    amount,
                    plan_label: plan.name.clone(),
                    token: payment_token.to_string(),
                },
            )
            .await?;

        let activation = PaidActivation {
            plan_id: plan.id,
            term,
            price: amount,
            start_date,
            next_renewal_date: next_renewal_date(start_date, term),
        };
        let subscription = self.ledger.activate(tenant.workspace_id, &activation).await?;
        info!(
            workspace_id = tenant.workspace_id,
            plan = %plan.name,
            term = %term.as_str(),
            charge = %receipt.charge_id,
            "workspace subscribed via direct charge"
        );
        self.notify_activation(tenant, &plan, Some(term), amount, start_date)
            .await;

        Ok(DirectChargeReceipt {
            customer_id: receipt.customer_id,
            charge_id: receipt.charge_id,
            subscription,
        })
    }

    /// Hands the payer off to the provider's hosted page. The callback
    /// URL carries the plan and term so the confirmation step can
    /// re-resolve the intent. Nothing is written here.
    pub async fn initiate_redirect(
        &self,
        tenant: &TenantContext,
        plan_id: i64,
        term: &str,
    ) -> PaymentResult<String> {
        let plan = self.resolve_plan(plan_id).await?;
        let term = Term::parse(term)?;
        let gateway = self
            .gateways
            .active_gateway(ProviderKind::Paystack)
            .await?
            .ok_or(PaymentError::GatewayNotConfigured("paystack"))?;

        let callback_url = format!(
            "{}/dashboard?payment=paystack&plan_id={}&term={}",
            self.app_url,
            plan.id,
            term.as_str()
        );
        let authorization_url = self
            .redirect
            .initiate(&gateway, &tenant.payer, &plan, term, &callback_url)
            .await?;
        info!(
            workspace_id = tenant.workspace_id,
            plan = %plan.name,
            "hosted checkout initiated"
        );
        Ok(authorization_url)
    }

    /// Entry point for the confirmation callback of redirect-style
    /// providers: performs the same paid activation a settled direct
    /// charge does.
    pub async fn activate(
        &self,
        tenant: &TenantContext,
        plan_id: i64,
        term: &str,
    ) -> PaymentResult<WorkspaceSubscription> {
        let plan = self.resolve_plan(plan_id).await?;
        let term = Term::parse(term)?;
        let amount = plan.amount_for(term);
        let start_date = today();
        let activation = PaidActivation {
            plan_id: plan.id,
            term,
            price: amount,
            start_date,
            next_renewal_date: next_renewal_date(start_date, term),
        };

        let lock = self.tenant_lock(tenant.workspace_id);
        let _guard = lock.lock().await;
        let subscription = self.ledger.activate(tenant.workspace_id, &activation).await?;
        info!(
            workspace_id = tenant.workspace_id,
            plan = %plan.name,
            term = %term.as_str(),
            "workspace subscription activated"
        );
        self.notify_activation(tenant, &plan, Some(term), amount, start_date)
            .await;
        Ok(subscription)
    }

    /// An unknown plan id is a silent no-op, returning `None` with the
    /// ledger untouched.
    pub async fn cancel(
        &self,
        tenant: &TenantContext,
        plan_id: i64,
    ) -> PaymentResult<Option<WorkspaceSubscription>> {
        let Some(_plan) = self.catalog.plan(plan_id).await? else {
            return Ok(None);
        };

        let lock = self.tenant_lock(tenant.workspace_id);
        let _guard = lock.lock().await;
        let state = self.ledger.deactivate(tenant.workspace_id).await?;
        info!(workspace_id = tenant.workspace_id, "workspace unsubscribed");
        Ok(Some(state))
    }

    async fn resolve_plan(&self, plan_id: i64) -> PaymentResult<Plan> {
        self.catalog
            .plan(plan_id)
            .await?
            .ok_or(PaymentError::PlanNotFound)
    }

    fn tenant_lock(&self, workspace_id: i64) -> Arc<Mutex<()>> {
        self.tenant_locks
            .entry(workspace_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn notify_activation(
        &self,
        tenant: &TenantContext,
        plan: &Plan,
        term: Option<Term>,
        price: f64,
        start_date: NaiveDate,
    ) {
        let event = SubscriptionActivated {
            workspace_id: tenant.workspace_id,
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            term,
            price,
            start_date,
        };
        if let Err(err) = self.notifications.dispatch(event).await {
            warn!(
                ?err,
                workspace_id = tenant.workspace_id,
                "admin notification dropped"
            );
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Renewal lands one month or one year after the start date, clamped
/// to the end of a shorter target month.
pub fn next_renewal_date(start: NaiveDate, term: Term) -> NaiveDate {
    let months = match term {
        Term::Monthly => Months::new(1),
        Term::Yearly => Months::new(12),
    };
    start.checked_add_months(months).unwrap_or(start)
}

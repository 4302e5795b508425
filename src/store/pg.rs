use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{GatewayRegistry, PlanCatalog, SubscriptionLedger};
use crate::models::{
    Gateway, NewPaymentMethod, PaidActivation, Plan, ProviderKind, StoredPaymentMethod, Term,
    WorkspaceSubscription,
};

/// key: billing-store-pg -> Postgres port implementation
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanCatalog for PgStore {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>> {
        let row = sqlx::query(
            "SELECT id, name, price_monthly, price_yearly FROM subscription_plans WHERE id = $1",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Plan {
            id: row.get("id"),
            name: row.get("name"),
            price_monthly: row.get("price_monthly"),
            price_yearly: row.get("price_yearly"),
        }))
    }
}

#[async_trait]
impl GatewayRegistry for PgStore {
    async fn active_gateway(&self, provider: ProviderKind) -> Result<Option<Gateway>> {
        let row = sqlx::query(
            r#"
            SELECT id, api_name, secret_key, public_key, monthly_plan_code, yearly_plan_code, active
            FROM payment_gateways
            WHERE api_name = $1 AND active = TRUE
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(map_gateway))
    }

    async fn active_gateways(&self) -> Result<Vec<Gateway>> {
        let rows = sqlx::query(
            r#"
            SELECT id, api_name, secret_key, public_key, monthly_plan_code, yearly_plan_code, active
            FROM payment_gateways
            WHERE active = TRUE
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(map_gateway).collect())
    }
}

#[async_trait]
impl SubscriptionLedger for PgStore {
    async fn subscription(&self, workspace_id: i64) -> Result<WorkspaceSubscription> {
        let row = sqlx::query(
            r#"
            SELECT id, subscribed, plan_id, term, price, trial,
                   subscription_start_date, next_renewal_date
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(map_workspace)
            .unwrap_or_else(|| WorkspaceSubscription::empty(workspace_id)))
    }

    async fn activate(
        &self,
        workspace_id: i64,
        activation: &PaidActivation,
    ) -> Result<WorkspaceSubscription> {
        let row = sqlx::query(
            r#"
            INSERT INTO workspaces (
                id, subscribed, plan_id, term, price, trial,
                subscription_start_date, next_renewal_date
            ) VALUES ($1, TRUE, $2, $3, $4, FALSE, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                subscribed = TRUE,
                plan_id = EXCLUDED.plan_id,
                term = EXCLUDED.term,
                price = EXCLUDED.price,
                trial = FALSE,
                subscription_start_date = EXCLUDED.subscription_start_date,
                next_renewal_date = EXCLUDED.next_renewal_date,
                updated_at = NOW()
            RETURNING id, subscribed, plan_id, term, price, trial,
                      subscription_start_date, next_renewal_date
            "#,
        )
        .bind(workspace_id)
        .bind(activation.plan_id)
        .bind(activation.term.as_str())
        .bind(activation.price)
        .bind(activation.start_date)
        .bind(activation.next_renewal_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_workspace(row))
    }

    async fn activate_free(
        &self,
        workspace_id: i64,
        plan_id: i64,
        start_date: NaiveDate,
    ) -> Result<WorkspaceSubscription> {
        let row = sqlx::query(
            r#"
            INSERT INTO workspaces (id, subscribed, plan_id, price, trial, subscription_start_date)
            VALUES ($1, TRUE, $2, 0, FALSE, $3)
            ON CONFLICT (id)
            DO UPDATE SET
                subscribed = TRUE,
                plan_id = EXCLUDED.plan_id,
                price = 0,
                trial = FALSE,
                subscription_start_date = EXCLUDED.subscription_start_date,
                updated_at = NOW()
            RETURNING id, subscribed, plan_id, term, price, trial,
                      subscription_start_date, next_renewal_date
            "#,
        )
        .bind(workspace_id)
        .bind(plan_id)
        .bind(start_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_workspace(row))
    }

    async fn deactivate(&self, workspace_id: i64) -> Result<WorkspaceSubscription> {
        let row = sqlx::query(
            r#"
            UPDATE workspaces
            SET subscribed = FALSE, plan_id = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING id, subscribed, plan_id, term, price, trial,
                      subscription_start_date, next_renewal_date
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(map_workspace)
            .unwrap_or_else(|| WorkspaceSubscription::empty(workspace_id)))
    }

    async fn store_payment_method(
        &self,
        method: NewPaymentMethod,
    ) -> Result<StoredPaymentMethod> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO payment_methods (id, gateway_id, user_id, token) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(method.gateway_id)
        .bind(method.user_id)
        .bind(&method.token)
        .execute(&self.pool)
        .await?;

        Ok(StoredPaymentMethod {
            id,
            gateway_id: method.gateway_id,
            user_id: method.user_id,
            token: method.token,
        })
    }

    async fn payment_methods(&self, user_id: i64) -> Result<Vec<StoredPaymentMethod>> {
        let rows = sqlx::query(
            r#"
            SELECT id, gateway_id, user_id, token
            FROM payment_methods
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StoredPaymentMethod {
                id: row.get("id"),
                gateway_id: row.get("gateway_id"),
                user_id: row.get("user_id"),
                token: row.get("token"),
            })
            .collect())
    }
}

fn map_gateway(row: PgRow) -> Option<Gateway> {
    let api_name: String = row.get("api_name");
    // Rows for providers this build does not know are ignored rather
    // than failing the whole lookup.
    let provider = ProviderKind::from_api_name(&api_name)?;
    Some(Gateway {
        id: row.get("id"),
        provider,
        secret_key: row.get("secret_key"),
        public_key: row.get("public_key"),
        monthly_plan_code: row.get("monthly_plan_code"),
        yearly_plan_code: row.get("yearly_plan_code"),
        active: row.get("active"),
    })
}

fn map_workspace(row: PgRow) -> WorkspaceSubscription {
    let term: Option<String> = row.get("term");
    WorkspaceSubscription {
        workspace_id: row.get("id"),
        subscribed: row.get("subscribed"),
        plan_id: row.get("plan_id"),
        term: term.as_deref().and_then(|raw| Term::parse(raw).ok()),
        price: row.get("price"),
        trial: row.get("trial"),
        subscription_start_date: row.get("subscription_start_date"),
        next_renewal_date: row.get("next_renewal_date"),
    }
}

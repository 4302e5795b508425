use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::mpsc::{channel, Sender};
use tracing::{error, info};

use crate::models::Term;

/// key: billing-notifications -> admin side channel
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionActivated {
    pub workspace_id: i64,
    pub plan_id: i64,
    pub plan_name: String,
    pub term: Option<Term>,
    pub price: f64,
    pub start_date: NaiveDate,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_admin(&self, event: &SubscriptionActivated) -> Result<()>;
}

/// Fallback sink when no webhook is configured.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify_admin(&self, event: &SubscriptionActivated) -> Result<()> {
        info!(
            workspace_id = event.workspace_id,
            plan = %event.plan_name,
            price = event.price,
            "workspace subscribed"
        );
        Ok(())
    }
}

/// Posts the event JSON to an operator-configured endpoint.
pub struct WebhookNotificationSink {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookNotificationSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("client build"),
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify_admin(&self, event: &SubscriptionActivated) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// key: billing-notifications-handle -> enqueue interface
#[derive(Clone)]
pub struct NotificationHandle {
    sender: Sender<SubscriptionActivated>,
}

impl NotificationHandle {
    pub async fn dispatch(&self, event: SubscriptionActivated) -> Result<()> {
        self.sender
            .send(event)
            .await
            .map_err(|err| anyhow!("failed to enqueue admin notification: {err}"))
    }
}

/// Spawns the drain loop. Delivery failures are logged and dropped;
/// they never reach the transaction that produced the event.
pub fn start_notification_worker(sink: Arc<dyn NotificationSink>) -> NotificationHandle {
    let (tx, mut rx) = channel(64);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(err) = sink.notify_admin(&event).await {
                error!(
                    ?err,
                    workspace_id = event.workspace_id,
                    "failed to deliver admin notification"
                );
            }
        }
    });
    NotificationHandle { sender: tx }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;

/// key: billing-models -> plans,gateways,workspace state

/// Billing term a paid subscription renews on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Monthly,
    Yearly,
}

impl Term {
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::Monthly => "monthly",
            Term::Yearly => "yearly",
        }
    }

    /// Parses a caller-supplied term. Anything other than the two
    /// recognized values is rejected before any gateway is contacted.
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        match raw {
            "monthly" => Ok(Term::Monthly),
            "yearly" => Ok(Term::Yearly),
            other => Err(PaymentError::InvalidTerm(other.to_string())),
        }
    }
}

/// key: billing-plan-model -> pricing terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub price_monthly: f64,
    pub price_yearly: f64,
}

impl Plan {
    pub fn amount_for(&self, term: Term) -> f64 {
        match term {
            Term::Monthly => self.price_monthly,
            Term::Yearly => self.price_yearly,
        }
    }

    /// Free-signup predicate: a non-zero monthly price with a zero
    /// yearly price. A plan with both prices at zero does NOT qualify
    /// and falls through to the paid flow.
    pub fn qualifies_for_free_signup(&self) -> bool {
        self.price_monthly != 0.0 && self.price_yearly == 0.0
    }
}

/// Payment model a provider supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Stripe,
    Paystack,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Stripe => "stripe",
            ProviderKind::Paystack => "paystack",
        }
    }

    pub fn from_api_name(raw: &str) -> Option<Self> {
        match raw {
            "stripe" => Some(ProviderKind::Stripe),
            "paystack" => Some(ProviderKind::Paystack),
            _ => None,
        }
    }

    /// Direct-charge providers submit the charge server-side against a
    /// stored token; redirect providers hand the payer a hosted page.
    pub fn supports_direct_charge(&self) -> bool {
        matches!(self, ProviderKind::Stripe)
    }

    pub fn supports_redirect_initiate(&self) -> bool {
        matches!(self, ProviderKind::Paystack)
    }
}

/// key: billing-gateway-model -> provider credentials
#[derive(Debug, Clone)]
pub struct Gateway {
    pub id: i64,
    pub provider: ProviderKind,
    pub secret_key: String,
    pub public_key: Option<String>,
    pub monthly_plan_code: Option<String>,
    pub yearly_plan_code: Option<String>,
    pub active: bool,
}

impl Gateway {
    pub fn plan_code_for(&self, term: Term) -> Option<&str> {
        match term {
            Term::Monthly => self.monthly_plan_code.as_deref(),
            Term::Yearly => self.yearly_plan_code.as_deref(),
        }
    }

    /// Presentation shape. Secret material never leaves the process.
    pub fn summary(&self) -> GatewaySummary {
        GatewaySummary {
            id: self.id,
            provider: self.provider,
            public_key: self.public_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewaySummary {
    pub id: i64,
    pub provider: ProviderKind,
    pub public_key: Option<String>,
}

/// key: billing-subscription-model -> workspace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSubscription {
    pub workspace_id: i64,
    pub subscribed: bool,
    pub plan_id: Option<i64>,
    pub term: Option<Term>,
    pub price: f64,
    pub trial: bool,
    pub subscription_start_date: Option<NaiveDate>,
    pub next_renewal_date: Option<NaiveDate>,
}

impl WorkspaceSubscription {
    /// State of a workspace the ledger has never written: unsubscribed,
    /// on trial, no plan attached.
    pub fn empty(workspace_id: i64) -> Self {
        Self {
            workspace_id,
            subscribed: false,
            plan_id: None,
            term: None,
            price: 0.0,
            trial: true,
            subscription_start_date: None,
            next_renewal_date: None,
        }
    }
}

/// Paid activation payload applied to the ledger in one atomic write.
#[derive(Debug, Clone)]
pub struct PaidActivation {
    pub plan_id: i64,
    pub term: Term,
    pub price: f64,
    pub start_date: NaiveDate,
    pub next_renewal_date: NaiveDate,
}

/// key: billing-payment-method -> saved provider token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPaymentMethod {
    pub id: Uuid,
    pub gateway_id: i64,
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct NewPaymentMethod {
    pub gateway_id: i64,
    pub user_id: i64,
    pub token: String,
}

/// Acting tenant, threaded explicitly through every orchestration call.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantContext {
    pub workspace_id: i64,
    pub payer: Payer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payer {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Payer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(monthly: f64, yearly: f64) -> Plan {
        Plan {
            id: 1,
            name: "Starter".to_string(),
            price_monthly: monthly,
            price_yearly: yearly,
        }
    }

    #[test]
    fn term_parses_known_values_only() {
        assert_eq!(Term::parse("monthly").unwrap(), Term::Monthly);
        assert_eq!(Term::parse("yearly").unwrap(), Term::Yearly);
        for raw in ["weekly", "free_plan", "MONTHLY", ""] {
            assert!(matches!(
                Term::parse(raw),
                Err(PaymentError::InvalidTerm(_))
            ));
        }
    }

    #[test]
    fn amount_follows_term() {
        let plan = plan(10.0, 100.0);
        assert_eq!(plan.amount_for(Term::Monthly), 10.0);
        assert_eq!(plan.amount_for(Term::Yearly), 100.0);
    }

    #[test]
    fn free_signup_requires_monthly_price_and_zero_yearly() {
        assert!(plan(29.0, 0.0).qualifies_for_free_signup());
        assert!(!plan(10.0, 100.0).qualifies_for_free_signup());
        assert!(!plan(0.0, 0.0).qualifies_for_free_signup());
        assert!(!plan(0.0, 50.0).qualifies_for_free_signup());
    }

    #[test]
    fn gateway_plan_code_selected_by_term() {
        let gateway = Gateway {
            id: 3,
            provider: ProviderKind::Paystack,
            secret_key: "sk".to_string(),
            public_key: None,
            monthly_plan_code: Some("PLN_m".to_string()),
            yearly_plan_code: Some("PLN_y".to_string()),
            active: true,
        };
        assert_eq!(gateway.plan_code_for(Term::Monthly), Some("PLN_m"));
        assert_eq!(gateway.plan_code_for(Term::Yearly), Some("PLN_y"));
    }

    #[test]
    fn gateway_summary_carries_no_secret_material() {
        let gateway = Gateway {
            id: 3,
            provider: ProviderKind::Stripe,
            secret_key: "sk_live_secret".to_string(),
            public_key: Some("pk_live_public".to_string()),
            monthly_plan_code: None,
            yearly_plan_code: None,
            active: true,
        };
        let rendered = serde_json::to_string(&gateway.summary()).unwrap();
        assert!(!rendered.contains("sk_live_secret"));
        assert!(rendered.contains("pk_live_public"));
    }
}

use once_cell::sync::Lazy;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// key: billing-config -> charge currency code
pub static CURRENCY: Lazy<String> = Lazy::new(|| {
    std::env::var("CURRENCY")
        .ok()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "usd".to_string())
});

/// key: billing-config -> statement descriptor source
pub static APP_NAME: Lazy<String> = Lazy::new(|| {
    std::env::var("APP_NAME")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "Billing Backend".to_string())
});

/// key: billing-config -> callback base for hosted checkout returns
pub static APP_URL: Lazy<String> = Lazy::new(|| {
    std::env::var("APP_URL")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "http://localhost:3000".to_string())
});

/// Bound timeout for every outbound payment-provider call. A provider
/// that exceeds it is treated as a failed charge, never a success.
pub static PROVIDER_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(30)
});

/// Base URL of the direct-charge provider API. Overridable for tests.
pub static STRIPE_API_BASE: Lazy<String> = Lazy::new(|| {
    std::env::var("STRIPE_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "https://api.stripe.com".to_string())
});

/// Base URL of the redirect-initiate provider API. Overridable for tests.
pub static PAYSTACK_API_BASE: Lazy<String> = Lazy::new(|| {
    std::env::var("PAYSTACK_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "https://api.paystack.co".to_string())
});

/// Optional webhook receiving admin notifications for new
/// subscriptions. When unset, events are logged instead.
pub static ADMIN_NOTIFY_WEBHOOK: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("ADMIN_NOTIFY_WEBHOOK"));

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

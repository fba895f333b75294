use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::shared::infrastructure::intent_outbox::relay::RelayConfig;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulsarConfig {
    pub url: String,
    pub tenant: String,
    pub namespace: String,
    pub producer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub relay: RelayConfig,
    /// `None` selects the in-memory bus.
    pub pulsar: Option<PulsarConfig>,
    /// `None` selects the approve-everything processor.
    pub stripe: Option<StripeConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let http_addr = parse_or(
            &get,
            "PAYMENTS_HTTP_ADDR",
            DEFAULT_HTTP_ADDR.parse::<SocketAddr>()?,
        )?;

        let defaults = RelayConfig::default();
        let poll_interval_ms = parse_or(
            &get,
            "PAYMENTS_RELAY_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;
        let batch_size = parse_or(&get, "PAYMENTS_RELAY_BATCH_SIZE", defaults.batch_size)?;
        let max_retries = parse_or(&get, "PAYMENTS_RELAY_MAX_RETRIES", defaults.max_retries)?;
        anyhow::ensure!(poll_interval_ms > 0, "PAYMENTS_RELAY_POLL_INTERVAL_MS must be positive");
        anyhow::ensure!(batch_size > 0, "PAYMENTS_RELAY_BATCH_SIZE must be positive");
        anyhow::ensure!(max_retries > 0, "PAYMENTS_RELAY_MAX_RETRIES must be positive");

        let pulsar = get("PAYMENTS_PULSAR_URL").map(|url| PulsarConfig {
            url: url.trim_end_matches('/').to_string(),
            tenant: get("PAYMENTS_PULSAR_TENANT").unwrap_or_else(|| "public".into()),
            namespace: get("PAYMENTS_PULSAR_NAMESPACE").unwrap_or_else(|| "default".into()),
            producer: get("PAYMENTS_PULSAR_PRODUCER").unwrap_or_else(|| "payments".into()),
        });

        let stripe = get("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
            api_base: get("STRIPE_API_BASE")
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            secret_key,
        });

        Ok(Self {
            http_addr,
            relay: RelayConfig {
                poll_interval: Duration::from_millis(poll_interval_ms),
                batch_size,
                max_retries,
            },
            pulsar,
            stripe,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

use std::net::SocketAddr;

use anyhow::Context;

use crate::gateway::auth::Account;

const DEFAULT_GATEWAY_URL: &str = "http://localhost:8081";
const DEFAULT_USERS: &str = "user:user:USER,admin:admin:ADMIN";

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    pub addr: SocketAddr,
    pub database_url: String,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
    /// Reject requests that did not come through the gateway.
    pub gateway_only: bool,
    pub gateway_url: String,
}

impl TrackerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("TRACKER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("TRACKER_PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://release_tracker.db?mode=rwc".to_string());

        let cache_enabled = env_flag("CACHE_ENABLED", true)?;

        let cache_max_entries: usize =
            std::env::var("CACHE_MAX_ENTRIES").ok().and_then(|s| s.parse().ok()).unwrap_or(10_000);

        let gateway_only = env_flag("GATEWAY_ONLY", false)?;
        let gateway_url =
            std::env::var("GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/TRACKER_PORT")?,
            database_url,
            cache_enabled,
            cache_max_entries,
            gateway_only,
            gateway_url,
        })
    }
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub addr: SocketAddr,
    /// Public URL of the gateway, stamped on forwarded requests as `Referer`.
    pub gateway_url: String,
    pub upstream_url: String,
    pub upstream_rps: u32,
    pub upstream_timeout_secs: u64,
    pub session_ttl_minutes: i64,
    pub accounts: Vec<Account>,
    pub default_accounts: bool,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("GATEWAY_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .context("GATEWAY_PORT")?;

        let gateway_url =
            std::env::var("GATEWAY_URL").unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string());
        let upstream_url =
            std::env::var("UPSTREAM_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let upstream_rps: u32 =
            std::env::var("UPSTREAM_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(50);

        let upstream_timeout_secs: u64 =
            std::env::var("UPSTREAM_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let session_ttl_minutes: i64 =
            std::env::var("SESSION_TTL_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(30);

        let (users, default_accounts) = match std::env::var("GATEWAY_USERS") {
            Ok(users) => (users, false),
            Err(_) => (DEFAULT_USERS.to_string(), true),
        };
        let accounts = Account::parse_list(&users).context("GATEWAY_USERS")?;

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/GATEWAY_PORT")?,
            gateway_url,
            upstream_url,
            upstream_rps,
            upstream_timeout_secs,
            session_ttl_minutes,
            accounts,
            default_accounts,
        })
    }
}

fn env_flag(name: &str, default: bool) -> anyhow::Result<bool> {
    match std::env::var(name) {
        Ok(value) => parse_flag(&value).with_context(|| format!("{name}={value}")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}

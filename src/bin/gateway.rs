use std::time::Duration;

use release_tracker::{
    config::GatewayConfig,
    gateway::{self, gateway_state},
    init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    let addr = config.addr;
    if config.default_accounts {
        tracing::warn!("GATEWAY_USERS not set, using the built-in user/admin accounts");
    }
    tracing::info!(
        upstream = %config.upstream_url,
        accounts = config.accounts.len(),
        "gateway configured"
    );

    let state = gateway_state(&config)?;

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let purged = sweeper.sessions.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired sessions purged");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "gateway listening");
    axum::serve(listener, gateway::app(state)).await?;

    Ok(())
}

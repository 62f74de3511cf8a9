//! Authenticating front door for the tracker: Basic or session login, role checks, logout, and
//! forwarding of `/releases` traffic.

pub mod auth;
pub mod proxy;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::{Router, middleware, routing::post};
use tower_http::trace::TraceLayer;

use crate::{config::GatewayConfig, error::AppResult};
use auth::Accounts;
use proxy::UpstreamClient;
use session::SessionStore;

pub struct GatewayState {
    pub accounts: Accounts,
    pub sessions: SessionStore,
    pub upstream: UpstreamClient,
}

pub fn gateway_state(config: &GatewayConfig) -> AppResult<Arc<GatewayState>> {
    let accounts = Accounts::new(config.accounts.iter().cloned());
    let sessions = SessionStore::new(config.session_ttl_minutes);
    let upstream = UpstreamClient::new(
        config.upstream_url.clone(),
        config.gateway_url.clone(),
        config.upstream_rps,
        config.upstream_timeout_secs,
    )?;
    Ok(Arc::new(GatewayState { accounts, sessions, upstream }))
}

pub fn app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/logout", post(routes::logout))
        .fallback(routes::forward)
        .layer(middleware::from_fn_with_state(state.clone(), routes::authorize))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub mod access;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod gateway;
pub mod models;
pub mod query;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cache::CacheManager, config::TrackerConfig, repository::ReleaseRepository,
    service::ReleaseService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TrackerConfig>,
    pub releases: ReleaseService,
}

pub fn tracker_state(config: TrackerConfig, db: DatabaseConnection) -> Arc<AppState> {
    let cache = CacheManager::new(config.cache_enabled, config.cache_max_entries);
    let releases = ReleaseService::new(ReleaseRepository::new(db), cache);
    Arc::new(AppState { config: Arc::new(config), releases })
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/releases/welcome", get(routes::welcome))
        .route("/releases", get(routes::list_releases).post(routes::create_release))
        .route(
            "/releases/{id}",
            get(routes::get_release).put(routes::update_release).delete(routes::delete_release),
        )
        .layer(middleware::from_fn_with_state(state.clone(), access::gateway_only))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

/// Shared `tracing` setup for both binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,release_tracker=debug,sqlx=warn".to_string()),
        )
        .init();
}

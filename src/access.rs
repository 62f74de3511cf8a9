use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, Uri,
        header::{ORIGIN, REFERER},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{AppState, error::AppError};

const API_DOCS_MARKER: &str = "swagger-ui";

/// Rejects requests that did not come through the gateway when `GATEWAY_ONLY` is set.
pub async fn gateway_only(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let config = &state.config;
    if !config.gateway_only || is_forwarded(req.headers(), req.uri(), &config.gateway_url) {
        return next.run(req).await;
    }

    warn!(
        method = %req.method(),
        path = %req.uri().path(),
        "rejected request that bypassed the gateway"
    );
    AppError::Forbidden(
        "Access denied. This endpoint is only accessible through the Release Tracker gateway."
            .to_string(),
    )
    .into_response()
}

/// A request counts as forwarded when its `Referer` or `Origin` starts with the gateway URL.
/// API documentation pages are let through as well.
pub fn is_forwarded(headers: &HeaderMap, uri: &Uri, gateway_url: &str) -> bool {
    let referer = headers.get(REFERER).and_then(|v| v.to_str().ok());
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());

    referer.is_some_and(|r| r.starts_with(gateway_url))
        || origin.is_some_and(|o| o.starts_with(gateway_url))
        || referer.is_some_and(|r| r.contains(API_DOCS_MARKER))
        || uri.to_string().contains(API_DOCS_MARKER)
}

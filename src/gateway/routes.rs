use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{
    GatewayState,
    auth::{self, Access, Principal},
    session::SESSION_COOKIE,
};
use crate::error::{AppError, AppResult};

/// Resolves the caller from the session cookie or Basic credentials and checks the route's
/// access rule. A Basic login opens a session and hands back its cookie.
pub async fn authorize(
    State(state): State<Arc<GatewayState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> AppResult<(CookieJar, Response)> {
    let access = auth::required_access(req.method(), req.uri().path());
    if access == Access::Public {
        return Ok((jar, next.run(req).await));
    }

    let from_session = jar.get(SESSION_COOKIE).and_then(|c| state.sessions.resolve(c.value()));
    let (principal, jar) = match from_session {
        Some(principal) => (principal, jar),
        None => {
            let principal = auth::basic_credentials(req.headers())
                .and_then(|(user, password)| state.accounts.verify(&user, &password))
                .ok_or_else(|| {
                    AppError::Unauthorized(
                        "Full authentication is required to access this resource".to_string(),
                    )
                })?;
            let id = state.sessions.open(principal.clone());
            (principal, jar.add(session_cookie(id, state.sessions.ttl_seconds())))
        },
    };

    if !access.permits(principal.role) {
        warn!(
            username = %principal.username,
            role = principal.role.as_str(),
            method = %req.method(),
            path = %req.uri().path(),
            "access denied"
        );
        return Err(AppError::Forbidden("Access Denied".to_string()));
    }

    debug!(username = %principal.username, role = principal.role.as_str(), "authorized");
    req.extensions_mut().insert(principal);
    Ok((jar, next.run(req).await))
}

fn session_cookie(id: String, ttl_seconds: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl_seconds))
        .build()
}

pub async fn logout(
    State(state): State<Arc<GatewayState>>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.invalidate(cookie.value()) {
            info!("session closed");
        }
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"));
    (jar, Json(json!({ "message": "Logout successful" })))
}

/// Proxies everything under `/releases` to the tracker.
pub async fn forward(
    State(state): State<Arc<GatewayState>>,
    req: Request,
) -> AppResult<Response> {
    if !auth::is_under(req.uri().path(), "/releases") {
        return Err(AppError::NotFound("The requested resource was not found.".to_string()));
    }

    if let Some(principal) = req.extensions().get::<Principal>() {
        info!(
            username = %principal.username,
            method = %req.method(),
            path = %req.uri().path(),
            "forwarding"
        );
    }
    state.upstream.forward(req).await
}

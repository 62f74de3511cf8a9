use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{
        HeaderName, HeaderValue, StatusCode,
        header::{
            AUTHORIZATION, CONNECTION, CONTENT_LENGTH, COOKIE, HOST, ORIGIN, PROXY_AUTHORIZATION,
            REFERER, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
        },
    },
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use tracing::debug;

use crate::error::{AppError, AppResult};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Forwards authorized requests to the tracker, stamping them with the gateway URL as `Referer`
/// so the tracker's gateway-only check lets them through.
pub struct UpstreamClient {
    client: wreq::Client,
    base_url: String,
    gateway_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl UpstreamClient {
    pub fn new(
        base_url: String,
        gateway_url: String,
        rps: u32,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let client = wreq::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Ok(Self { client, base_url, gateway_url, limiter })
    }

    pub async fn forward(&self, req: Request) -> AppResult<Response> {
        self.limiter.until_ready().await;

        let (parts, body) = req.into_parts();
        let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path_and_query);
        let referer = format!("{}{}", self.gateway_url.trim_end_matches('/'), parts.uri.path());

        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| AppError::BadRequest("Request body too large".to_string()))?;

        let method = wreq::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|err| AppError::BadRequest(err.to_string()))?;

        debug!(method = %parts.method, url = %url, "forwarding to upstream");
        let mut upstream = self.client.request(method, url.as_str());
        for (name, value) in &parts.headers {
            if forwardable_request_header(name) {
                upstream = upstream.header(name.as_str(), value.as_bytes());
            }
        }
        let resp = upstream
            .header(REFERER.as_str(), referer.as_str())
            .body(body.to_vec())
            .send()
            .await?;

        let status = StatusCode::from_u16(resp.status().as_u16())
            .map_err(|err| AppError::Upstream(err.to_string()))?;
        let mut headers = Vec::new();
        for (name, value) in resp.headers() {
            let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) else { continue };
            if is_hop_by_hop(&name) || name == CONTENT_LENGTH {
                continue;
            }
            if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
                headers.push((name, value));
            }
        }
        let bytes = resp.bytes().await?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "upstream responded");

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        response.headers_mut().extend(headers);
        Ok(response)
    }
}

/// Stripped in both directions, along with credentials on the way in.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    [CONNECTION, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE].contains(name)
}

fn forwardable_request_header(name: &HeaderName) -> bool {
    !is_hop_by_hop(name)
        && ![HOST, AUTHORIZATION, COOKIE, CONTENT_LENGTH, REFERER, ORIGIN].contains(name)
}

#[cfg(test)]
mod tests {
    use axum::http::header::{ACCEPT, CONTENT_TYPE};

    use super::*;

    #[test]
    fn credentials_and_hop_headers_stay_behind() {
        assert!(forwardable_request_header(&ACCEPT));
        assert!(forwardable_request_header(&CONTENT_TYPE));
        for name in [AUTHORIZATION, COOKIE, HOST, REFERER, ORIGIN, CONNECTION, TRANSFER_ENCODING] {
            assert!(!forwardable_request_header(&name), "{name}");
        }
    }
}

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use jiff::civil::Date;
use serde::Deserialize;
use tracing::info;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{self, CreateRelease, Release, Status, UpdateRelease},
    query::{Pageable, ReleaseFilter},
};

pub async fn welcome() -> &'static str {
    "Welcome to Release Tracker Service"
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    status: Option<Status>,
    name: Option<String>,
    description: Option<String>,
    release_date: Option<Date>,
    page: Option<u64>,
    size: Option<u64>,
    sort: Option<String>,
}

pub async fn list_releases(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> AppResult<Json<Vec<Release>>> {
    info!(?params, "request to list releases");

    let pageable = Pageable::from_params(params.page, params.size, params.sort.as_deref())?;
    let filter =
        ReleaseFilter::new(params.status, params.name, params.description, params.release_date);

    Ok(Json(state.releases.list(filter, pageable).await?))
}

pub async fn get_release(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<Json<Release>> {
    info!(id, "request to get release");
    Ok(Json(state.releases.get(id).await?))
}

pub async fn create_release(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(req), _): WithRejection<Json<CreateRelease>, AppError>,
) -> AppResult<(StatusCode, Json<Release>)> {
    let new = req.validate(models::today())?;
    let created = state.releases.create(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_release(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateRelease>, AppError>,
) -> AppResult<Json<Release>> {
    let patch = req.validate(models::today())?;
    Ok(Json(state.releases.update(id, patch).await?))
}

pub async fn delete_release(
    State(state): State<Arc<AppState>>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> AppResult<StatusCode> {
    state.releases.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Method, Request, Response, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{app, config::TrackerConfig, db, tracker_state};

    async fn test_app(gateway_only: bool) -> Router {
        let config = TrackerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".into(),
            cache_enabled: true,
            cache_max_entries: 100,
            gateway_only,
            gateway_url: "http://localhost:8081".into(),
        };
        let db = db::connect_in_memory().await.unwrap();
        app(tracker_state(config, db))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };
        app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
    }

    async fn json_body(resp: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn release_1() -> Value {
        json!({
            "name": "Release 1",
            "description": "First release",
            "status": "CREATED",
            "releaseDate": crate::models::today().to_string(),
        })
    }

    #[tokio::test]
    async fn welcome_is_plain_text() {
        let app = test_app(false).await;
        let resp = send(&app, Method::GET, "/releases/welcome", None).await;
        assert_eq!(resp.status(), 200);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Welcome to Release Tracker Service");
    }

    #[tokio::test]
    async fn create_get_update_delete_round_trip() {
        let app = test_app(false).await;

        let resp = send(&app, Method::POST, "/releases", Some(release_1())).await;
        assert_eq!(resp.status(), 201);
        let created = json_body(resp).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["status"], "CREATED");
        assert_eq!(created["createdAt"], created["lastUpdateAt"]);

        let resp = send(&app, Method::GET, "/releases/1", None).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await, created);

        let resp = send(&app, Method::PUT, "/releases/1", Some(json!({"status": "DONE"}))).await;
        assert_eq!(resp.status(), 200);
        let updated = json_body(resp).await;
        assert_eq!(updated["status"], "DONE");
        assert_eq!(updated["name"], "Release 1");
        assert_eq!(updated["description"], "First release");
        assert_eq!(updated["releaseDate"], created["releaseDate"]);

        let resp = send(&app, Method::DELETE, "/releases/1", None).await;
        assert_eq!(resp.status(), 204);

        let resp = send(&app, Method::GET, "/releases/1", None).await;
        assert_eq!(resp.status(), 404);
        assert_eq!(json_body(resp).await["message"], "Release not found with id:1");
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict() {
        let app = test_app(false).await;
        send(&app, Method::POST, "/releases", Some(release_1())).await;
        let resp = send(&app, Method::POST, "/releases", Some(release_1())).await;
        assert_eq!(resp.status(), 409);
        assert_eq!(
            json_body(resp).await["message"],
            "Release already exists with the name:Release 1"
        );
    }

    #[tokio::test]
    async fn validation_failures_are_reported_per_field() {
        let app = test_app(false).await;
        let body = json!({"name": " ", "releaseDate": "2000-01-01"});
        let resp = send(&app, Method::POST, "/releases", Some(body)).await;
        assert_eq!(resp.status(), 400);

        let body = json_body(resp).await;
        assert_eq!(body["errors"]["name"], "Name cannot be empty");
        assert_eq!(body["errors"]["description"], "Description cannot be empty");
        assert_eq!(body["errors"]["status"], "Status is required");
        assert_eq!(body["errors"]["releaseDate"], "Release date cannot be in the past");
    }

    #[tokio::test]
    async fn unknown_status_is_a_bad_request() {
        let app = test_app(false).await;
        let mut body = release_1();
        body["status"] = json!("SHIPPED");
        let resp = send(&app, Method::POST, "/releases", Some(body)).await;
        assert_eq!(resp.status(), 400);
        let message = json_body(resp).await["message"].as_str().unwrap().to_string();
        assert!(message.contains("SHIPPED"), "{message}");

        let resp = send(&app, Method::GET, "/releases?status=SHIPPED", None).await;
        assert_eq!(resp.status(), 400);

        let resp = send(&app, Method::GET, "/releases/abc", None).await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn update_rejects_past_dates() {
        let app = test_app(false).await;
        send(&app, Method::POST, "/releases", Some(release_1())).await;
        let past = json!({"releaseDate": "2001-01-01"});
        let resp = send(&app, Method::PUT, "/releases/1", Some(past)).await;
        assert_eq!(resp.status(), 400);

        let resp = send(&app, Method::PUT, "/releases/9", Some(json!({"status": "DONE"}))).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn list_filters_pages_and_sorts() {
        let app = test_app(false).await;
        let today = crate::models::today();
        for (i, status) in ["DONE", "CREATED", "DONE"].iter().enumerate() {
            let date = today.checked_add(jiff::Span::new().days(i as i64)).unwrap();
            let body = json!({
                "name": format!("R{i}"),
                "description": "d",
                "status": status,
                "releaseDate": date.to_string(),
            });
            assert_eq!(send(&app, Method::POST, "/releases", Some(body)).await.status(), 201);
        }

        let resp = send(&app, Method::GET, "/releases", None).await;
        let body = json_body(resp).await;
        let names: Vec<Value> =
            body.as_array().unwrap().iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, [json!("R2"), json!("R1"), json!("R0")]);

        let uri = "/releases?status=DONE&sort=name,asc&size=1&page=1";
        let resp = send(&app, Method::GET, uri, None).await;
        let page = json_body(resp).await;
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["name"], "R2");

        let resp = send(&app, Method::GET, "/releases?name=R0", None).await;
        assert_eq!(json_body(resp).await, json!([]));

        let resp = send(&app, Method::GET, "/releases?sort=colour", None).await;
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let app = test_app(false).await;
        send(&app, Method::POST, "/releases", Some(release_1())).await;

        let resp = send(&app, Method::GET, "/releases?page=9223372036854775807", None).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await, json!([]));

        let uri = "/releases?page=18446744073709551615&size=2000";
        let resp = send(&app, Method::GET, uri, None).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(json_body(resp).await, json!([]));
    }

    #[tokio::test]
    async fn gateway_only_rejects_direct_calls() {
        let app = test_app(true).await;

        let resp = send(&app, Method::GET, "/releases", None).await;
        assert_eq!(resp.status(), 403);
        assert!(
            json_body(resp).await["message"].as_str().unwrap().starts_with("Access denied.")
        );

        let req = Request::get("/releases")
            .header(header::REFERER, "http://localhost:8081/releases")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}

//! Router configuration.
//!
//! This module creates the main Axum router: a health check outside the
//! session layer and the session inspection endpoints behind it.

use std::collections::BTreeMap;

use axum::{
    extract::Path,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::session::{session_layer, Session};
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let health = Router::new().route("/health", get(health_check));

    let sessions = Router::new()
        .route("/session", get(show_session))
        .route(
            "/session/attributes/{name}",
            get(get_attribute).put(put_attribute).delete(delete_attribute),
        )
        .route("/session/invalidate", post(invalidate_session))
        .route_layer(middleware::from_fn_with_state(state, session_layer));

    Router::new()
        .merge(health)
        .merge(sessions)
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Session as seen by the current request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    id: String,
    is_new: bool,
    creation_time: i64,
    last_accessed_time: i64,
    max_inactive_interval: i32,
    attributes: BTreeMap<String, Value>,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_session(Session(session): Session) -> Json<SessionView> {
    let attributes = session
        .attribute_names()
        .into_iter()
        .filter_map(|name| session.get(&name).map(|value| (name, value)))
        .collect();

    Json(SessionView {
        id: session.id(),
        is_new: session.is_new(),
        creation_time: session.creation_time(),
        last_accessed_time: session.last_accessed_time(),
        max_inactive_interval: session.max_inactive_interval(),
        attributes,
    })
}

async fn get_attribute(
    Session(session): Session,
    Path(name): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    session.get(&name).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn put_attribute(
    Session(session): Session,
    Path(name): Path<String>,
    Json(value): Json<Value>,
) -> StatusCode {
    session.set(name, value);
    StatusCode::NO_CONTENT
}

async fn delete_attribute(Session(session): Session, Path(name): Path<String>) -> StatusCode {
    match session.remove(&name) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn invalidate_session(Session(session): Session) -> StatusCode {
    session.invalidate();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::Request;
    use gs_store::{MemoryStore, StoreOp};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    fn app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(ServerConfig::for_testing("shop"), store.clone()).unwrap();
        (create_router(state), store)
    }

    fn request(method: &str, uri: &str, session_id: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = session_id {
            builder = builder.header(COOKIE, format!("GSSESSIONID={id}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &axum::response::Response) -> Option<String> {
        response
            .headers()
            .get(SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string())
    }

    async fn new_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(request("GET", "/session", None))
            .await
            .unwrap();
        json_body(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, store) = app();
        let response = app.oneshot(request("GET", "/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        assert_eq!(json_body(response).await["status"], "healthy");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn first_request_starts_session_and_sets_cookie() {
        let (app, store) = app();
        let response = app.oneshot(request("GET", "/session", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookie(&response).unwrap();
        let body = json_body(response).await;
        let id = body["id"].as_str().unwrap();

        assert!(cookie.starts_with(&format!("GSSESSIONID={id};")));
        assert_eq!(body["isNew"], true);
        assert_eq!(body["attributes"], serde_json::json!({}));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_cookie_is_replaced() {
        let (app, _) = app();
        let response = app
            .oneshot(request("GET", "/session", Some("stale")))
            .await
            .unwrap();

        let cookie = set_cookie(&response).unwrap();
        assert!(!cookie.starts_with("GSSESSIONID=stale;"));
        assert_eq!(json_body(response).await["isNew"], true);
    }

    #[tokio::test]
    async fn attributes_persist_across_requests() {
        let (app, store) = app();
        let id = new_session(&app).await;

        let put = Request::builder()
            .method("PUT")
            .uri("/session/attributes/cart")
            .header(COOKIE, format!("GSSESSIONID={id}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"items":2}"#))
            .unwrap();
        let response = app.clone().oneshot(put).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(set_cookie(&response).is_none());

        let response = app
            .clone()
            .oneshot(request("GET", "/session/attributes/cart", Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!({"items": 2}));

        let response = app
            .oneshot(request("GET", "/session", Some(&id)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["isNew"], false);
        assert_eq!(body["attributes"]["cart"]["items"], 2);
        assert!(!store.has_locks());
    }

    #[tokio::test]
    async fn missing_attribute_is_not_found() {
        let (app, _) = app();
        let id = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(request("GET", "/session/attributes/nope", Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(request("DELETE", "/session/attributes/nope", Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalidate_removes_session_and_expires_cookie() {
        let (app, store) = app();
        let id = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(request("POST", "/session/invalidate", Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(set_cookie(&response).unwrap().contains("Max-Age=0"));
        assert!(store.is_empty());
        assert!(!store.has_locks());

        let response = app
            .oneshot(request("GET", "/session", Some(&id)))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["isNew"], true);
        assert_ne!(body["id"], id.as_str());
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() {
        let (app, store) = app();
        store.fail_next(StoreOp::Put);

        let response = app.oneshot(request("GET", "/session", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(set_cookie(&response).is_none());
    }
}

pub mod auth;
pub mod catalog;
pub mod health;
pub mod mentors;
pub mod sessions;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mentora_shared::errors::{AppError, AppResult};
use mentora_shared::middleware::metrics_middleware;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.frontend_url);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/delete-account", delete(auth::delete_account))
        // Reference data
        .route("/majors", get(catalog::list_majors))
        .route("/roles", get(catalog::list_roles))
        // Mentors
        .route("/mentors/:id", get(mentors::get_mentor))
        .route("/mentors/:id/availability", get(mentors::availability))
        // Sessions
        .route("/sessions", get(sessions::list_sessions).post(sessions::book_session))
        .route("/sessions/update-expired", put(sessions::update_expired))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id/reschedule", put(sessions::reschedule_session))
        .route("/sessions/:id/status", put(sessions::update_status))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `frontend_url` is a comma-separated origin list, or `*` for any origin.
fn build_cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        tracing::warn!("CORS: permissive mode, any origin is allowed");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = s, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();

    tracing::info!(count = origins.len(), "CORS: restricted origins");

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Unwraps a JSON body, reporting malformed input in the API error envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use diesel::r2d2::{ConnectionManager, Pool};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;
    use uuid::Uuid;

    use mentora_shared::types::auth::AccountRole;

    use crate::config::AppConfig;
    use crate::services::token_service::create_access_token;
    use crate::AppState;

    /// Router over a pool that never connects; only paths that fail before
    /// touching the database are exercised.
    pub fn app() -> (Router, Arc<AppState>) {
        let db = Pool::builder()
            .connection_timeout(Duration::from_millis(250))
            .build_unchecked(ConnectionManager::new("postgres://invalid"));
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = Arc::new(AppState::new(AppConfig::default(), db, handle).unwrap());
        (super::router(state.clone()), state)
    }

    pub fn bearer(state: &AppState, role: AccountRole) -> String {
        let token =
            create_access_token(Uuid::now_v7(), role, "t@example.com", &state.jwt, 600).unwrap();
        format!("Bearer {}", token.access_token)
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use super::test_support::{app, send};
    use super::*;

    #[tokio::test]
    async fn roles_are_listed_without_auth() {
        let (app, _) = app();
        let (status, body) = send(app, Request::get("/roles").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!(["mentor", "mentee"]));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders() {
        let (app, _) = app();
        let request = Request::get("/metrics").body(Body::empty()).unwrap();
        let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (app, _) = app();
        let (status, _) = send(app, Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn cors_layer_tolerates_bad_origins() {
        let _ = build_cors_layer("http://localhost:3000, ,\u{7f}bad");
        let _ = build_cors_layer("*");
    }
}

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::RunQueryDsl;

use mentora_shared::clients::db::interact;
use mentora_shared::{HealthCheck, HealthResponse};

use crate::AppState;

/// Liveness plus a `SELECT 1` round trip to Postgres.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let database = match interact(&state.db, |conn| {
        Ok(diesel::sql_query("SELECT 1").execute(conn)?)
    })
    .await
    {
        Ok(_) => HealthCheck::healthy("database"),
        Err(e) => HealthCheck::unhealthy("database", e.to_string()),
    };

    let response = HealthResponse::healthy("mentora-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![database]);

    (response.http_status(), Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use crate::routes::test_support::{app, send};

    #[tokio::test]
    async fn unreachable_database_reports_unhealthy() {
        let (app, _) = app();
        let (status, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"][0]["name"], "database");
    }
}

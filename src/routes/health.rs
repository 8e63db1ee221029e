use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub store: String,
    pub store_backend: String,
    pub database: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = state.store.health_check().await.is_ok();
    let database = match &state.db {
        Some(pool) if db::health_check(pool).await => "ok",
        Some(_) => "error",
        None => "disabled",
    };

    // The store holds estimates and progress, so it is critical
    let status = match (store_ok, database) {
        (false, _) => "unhealthy",
        (true, "error") => "degraded",
        _ => "healthy",
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                store: if store_ok { "ok" } else { "error" }.to_string(),
                store_backend: state.store.backend().to_string(),
                database: database.to_string(),
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{app, send};
    use axum::http::Method;

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = send(&app(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["services"]["store_backend"], "memory");
        assert_eq!(body["services"]["database"], "disabled");
    }
}

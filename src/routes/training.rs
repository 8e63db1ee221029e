use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::{DataResponse, NoContent};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::progress::{ModuleDefinition, ModuleProgressResponse, ProgressEvent};
use crate::error::ApiResult;

/// List the onboarding catalogue
pub async fn list_modules(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> DataResponse<Vec<ModuleDefinition>> {
    tracing::info!(user_id = %auth.user_id, "Listing training modules");

    DataResponse::new(state.progress.catalog().modules().to_vec())
}

/// Current progress for the authenticated user
pub async fn get_progress(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> ApiResult<DataResponse<ModuleProgressResponse>> {
    tracing::info!(user_id = %auth.user_id, module_id = %module_id, "Getting training progress");

    let progress = state.progress.load(&module_id, &auth.user_id).await?;
    Ok(DataResponse::new(progress))
}

/// Apply a progress event
pub async fn record_progress(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
    payload: Result<Json<ProgressEvent>, JsonRejection>,
) -> ApiResult<DataResponse<ModuleProgressResponse>> {
    let Json(event) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        module_id = %module_id,
        event = ?event,
        "Recording training progress"
    );

    let progress = state.progress.record(&module_id, &auth.user_id, &event).await?;
    Ok(DataResponse::new(progress))
}

/// Clear progress for the authenticated user
pub async fn reset_progress(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(module_id): Path<String>,
) -> ApiResult<NoContent> {
    state.progress.reset(&module_id, &auth.user_id).await?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    const PATH: &str = "/training/modules/day-2/progress";

    #[tokio::test]
    async fn catalogue_lists_onboarding_days() {
        let (status, body) = send(&app(), Method::GET, "/training/modules", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["day-1", "day-2", "day-3"]);
    }

    #[tokio::test]
    async fn progress_round_trip_per_user() {
        let app = app();
        let event = json!({
            "type": "video_progress",
            "title": "Managing Insurance Authorisations",
            "percentage": 96
        });

        let (status, body) = send(&app, Method::POST, PATH, Some("u1"), Some(event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["summary"]["videos_completed"], 1);
        // 1 of 6 items
        assert_eq!(body["data"]["summary"]["percentage"], 17);

        let (_, other) = send(&app, Method::GET, PATH, Some("u2"), None).await;
        assert_eq!(other["data"]["summary"]["percentage"], 0);

        let (status, body) = send(&app, Method::DELETE, PATH, Some("u1"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (_, mine) = send(&app, Method::GET, PATH, Some("u1"), None).await;
        assert_eq!(mine["data"]["summary"]["percentage"], 0);
    }

    #[tokio::test]
    async fn unknown_module_and_title() {
        let app = app();
        let (status, _) = send(
            &app,
            Method::GET,
            "/training/modules/day-42/progress",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let event = json!({ "type": "reading_completed", "title": "Unknown" });
        let (status, body) = send(&app, Method::POST, PATH, Some("u1"), Some(event)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}

//! Estimate generation and revision endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{
    ApprovalRequest, EstimateLineItem, GenerateEstimateRequest, JobEstimate, LineItemQuery,
    ReviseEstimateRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::services::store::keys;

/// How long an estimate stays readable after its validity ends
const EXPIRED_RETENTION_DAYS: i64 = 30;

/// Load a stored estimate, persisting the expired status once its
/// validity has passed
async fn load_estimate(
    state: &AppState,
    estimate_id: Uuid,
    now: DateTime<Utc>,
) -> ApiResult<JobEstimate> {
    let mut estimate: JobEstimate = state
        .store
        .get_json(&keys::estimate(estimate_id))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Estimate {} not found", estimate_id)))?;

    if estimate.expire_if_due(now) {
        tracing::info!(estimate_id = %estimate_id, "Estimate expired");
        save_estimate(state, &estimate, now).await?;
    }
    Ok(estimate)
}

async fn save_estimate(state: &AppState, estimate: &JobEstimate, now: DateTime<Utc>) -> ApiResult<()> {
    let retain_until = estimate.valid_until + Duration::days(EXPIRED_RETENTION_DAYS);
    let ttl = (retain_until - now).to_std().ok();
    state
        .store
        .set_json(&keys::estimate(estimate.id), estimate, ttl)
        .await?;
    Ok(())
}

fn generate(
    state: &AppState,
    auth: &RequireAuth,
    req: GenerateEstimateRequest,
    now: DateTime<Utc>,
) -> ApiResult<JobEstimate> {
    let mut estimate = state.estimator.generate(req.assessment, req.job_id, now)?;
    estimate.metadata.created_by = auth.actor().to_string();
    estimate.metadata.last_modified_by = auth.actor().to_string();
    Ok(estimate)
}

/// Generate an estimate from a site assessment and store it
pub async fn create_estimate(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateEstimateRequest>, JsonRejection>,
) -> ApiResult<Created<JobEstimate>> {
    let Json(req) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        assessment_id = %req.assessment.id,
        rooms = req.assessment.rooms().len(),
        "Generating estimate"
    );

    let now = Utc::now();
    let estimate = generate(&state, &auth, req, now)?;
    save_estimate(&state, &estimate, now).await?;

    tracing::info!(
        estimate_id = %estimate.id,
        estimate_number = %estimate.estimate_number,
        total = estimate.totals.total,
        "Estimate stored"
    );

    Ok(Created(estimate))
}

/// Generate an estimate without storing it
pub async fn preview_estimate(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateEstimateRequest>, JsonRejection>,
) -> ApiResult<DataResponse<JobEstimate>> {
    let Json(req) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        assessment_id = %req.assessment.id,
        "Previewing estimate"
    );

    let estimate = generate(&state, &auth, req, Utc::now())?;
    Ok(DataResponse::new(estimate))
}

/// Get a stored estimate
pub async fn get_estimate(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
) -> ApiResult<DataResponse<JobEstimate>> {
    tracing::info!(user_id = %auth.user_id, estimate_id = %estimate_id, "Getting estimate");

    let estimate = load_estimate(&state, estimate_id, Utc::now()).await?;
    Ok(DataResponse::new(estimate))
}

/// List an estimate's line items, optionally for one category
pub async fn list_line_items(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    query: Result<Query<LineItemQuery>, QueryRejection>,
) -> ApiResult<DataResponse<Vec<EstimateLineItem>>> {
    let Query(query) = query?;

    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate_id,
        category = ?query.category,
        "Listing line items"
    );

    let estimate = load_estimate(&state, estimate_id, Utc::now()).await?;
    let items = estimate
        .line_items
        .into_iter()
        .filter(|item| query.category.map_or(true, |c| item.category == c))
        .collect();

    Ok(DataResponse::new(items))
}

/// Apply line item adjustments, replacing the stored estimate with the
/// next version
pub async fn revise_estimate(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    payload: Result<Json<ReviseEstimateRequest>, JsonRejection>,
) -> ApiResult<DataResponse<JobEstimate>> {
    let Json(req) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate_id,
        adjustments = req.adjustments.len(),
        "Revising estimate"
    );

    let now = Utc::now();
    let previous = load_estimate(&state, estimate_id, now).await?;
    let revised = state
        .estimator
        .revise(&previous, &req.adjustments, auth.actor(), now)?;
    save_estimate(&state, &revised, now).await?;

    tracing::info!(
        estimate_id = %revised.id,
        version = revised.version,
        total = revised.totals.total,
        "Estimate revised"
    );

    Ok(DataResponse::new(revised))
}

/// Issue a draft estimate to the client
pub async fn send_estimate(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
) -> ApiResult<DataResponse<JobEstimate>> {
    tracing::info!(user_id = %auth.user_id, estimate_id = %estimate_id, "Sending estimate");

    let now = Utc::now();
    let previous = load_estimate(&state, estimate_id, now).await?;
    let sent = state.estimator.send(&previous, auth.actor(), now)?;
    save_estimate(&state, &sent, now).await?;

    Ok(DataResponse::new(sent))
}

/// Record the client's approval, rejection or revision request
pub async fn record_approval(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    payload: Result<Json<ApprovalRequest>, JsonRejection>,
) -> ApiResult<DataResponse<JobEstimate>> {
    let Json(req) = payload?;

    tracing::info!(
        user_id = %auth.user_id,
        estimate_id = %estimate_id,
        decision = ?req.decision,
        "Recording estimate decision"
    );

    let now = Utc::now();
    let previous = load_estimate(&state, estimate_id, now).await?;
    let decided = state.estimator.decide(&previous, req, now)?;
    save_estimate(&state, &decided, now).await?;

    tracing::info!(
        estimate_id = %decided.id,
        status = %decided.status,
        version = decided.version,
        "Estimate decision recorded"
    );

    Ok(DataResponse::new(decided))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    fn assessment(rooms: Value) -> Value {
        json!({
            "job_id": "JOB-7",
            "assessment": {
                "id": "SA001",
                "property_details": {
                    "address": "12 Harbour St, Sydney NSW 2000",
                    "property_type": "residential",
                    "rooms": rooms
                },
                "damage_assessment": {
                    "primary_cause": "water_damage",
                    "category": 2,
                    "class": 2
                }
            }
        })
    }

    fn bedroom() -> Value {
        assessment(json!([{
            "id": "R001",
            "name": "Master Bedroom",
            "area": 14.0,
            "affected_percentage": 80.0,
            "equipment": [{ "type": "Air Mover", "quantity": 2, "duration": 3 }]
        }]))
    }

    #[tokio::test]
    async fn requires_authentication() {
        let (status, body) = send(&app(), Method::POST, "/estimates", None, Some(bedroom())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn create_then_fetch_estimate() {
        let app = app();
        let (status, created) =
            send(&app, Method::POST, "/estimates", Some("user-1"), Some(bedroom())).await;
        assert_eq!(status, StatusCode::CREATED);

        let estimate = &created["data"];
        assert_eq!(estimate["job_id"], "JOB-7");
        assert_eq!(estimate["version"], 1);
        assert_eq!(estimate["type"], "initial");
        assert_eq!(estimate["totals"]["subtotal"], 2000.0);
        assert_eq!(estimate["totals"]["total"], 2420.0);
        assert_eq!(estimate["metadata"]["created_by"], "user-1@example.com");

        let id = estimate["id"].as_str().unwrap();
        let (status, fetched) =
            send(&app, Method::GET, &format!("/estimates/{}", id), Some("user-2"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["estimate_number"], estimate["estimate_number"]);

        let (status, items) = send(
            &app,
            Method::GET,
            &format!("/estimates/{}/line-items?category=labour", id),
            Some("user-1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let codes: Vec<&str> = items["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["item_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["LAB-001", "LAB-002"]);
    }

    #[tokio::test]
    async fn preview_is_not_stored() {
        let app = app();
        let (status, preview) =
            send(&app, Method::POST, "/estimates/preview", Some("user-1"), Some(bedroom())).await;
        assert_eq!(status, StatusCode::OK);

        let id = preview["data"]["id"].as_str().unwrap();
        let (status, _) =
            send(&app, Method::GET, &format!("/estimates/{}", id), Some("user-1"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_assessments_are_rejected() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/estimates",
            Some("user-1"),
            Some(assessment(json!([]))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let mut bad_category = bedroom();
        bad_category["assessment"]["damage_assessment"]["category"] = json!(5);
        let (status, body) =
            send(&app, Method::POST, "/estimates", Some("user-1"), Some(bad_category)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("category must be 1, 2 or 3"));
    }

    #[tokio::test]
    async fn unknown_equipment_carries_warning() {
        let body = assessment(json!([{
            "id": "R9",
            "name": "Garage",
            "area": 20.0,
            "affected_percentage": 50.0,
            "equipment": [{ "type": "Ozone Generator", "quantity": 1, "duration": 2 }]
        }]));
        let (status, preview) =
            send(&app(), Method::POST, "/estimates/preview", Some("user-1"), Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let item = preview["data"]["line_items"]
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["category"] == "equipment")
            .unwrap()
            .clone();
        assert_eq!(item["unit_price"], 50.0);
        assert_eq!(item["warnings"], json!(["default_equipment_rate"]));
    }

    #[tokio::test]
    async fn revision_replaces_stored_estimate() {
        let app = app();
        let (_, created) =
            send(&app, Method::POST, "/estimates", Some("user-1"), Some(bedroom())).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let adjustments = json!({
            "adjustments": [
                { "action": "remove_item", "id": "LI-005" },
                {
                    "action": "add_custom_item",
                    "category": "cleaning",
                    "description": "Carpet steam clean",
                    "quantity": 14,
                    "unit": "m²",
                    "unit_price": 10
                }
            ]
        });
        let (status, revised) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/revisions", id),
            Some("user-2"),
            Some(adjustments),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(revised["data"]["version"], 2);
        assert_eq!(revised["data"]["type"], "revised");
        // 2000 - 250 + 140
        assert_eq!(revised["data"]["totals"]["subtotal"], 1890.0);
        assert_eq!(revised["data"]["metadata"]["last_modified_by"], "user-2@example.com");

        let cleaning = revised["data"]["comparisons"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["category"] == "cleaning")
            .unwrap()
            .clone();
        assert_eq!(cleaning["variance"], Value::Null);

        let (_, fetched) =
            send(&app, Method::GET, &format!("/estimates/{}", id), Some("user-1"), None).await;
        assert_eq!(fetched["data"]["version"], 2);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/revisions", id),
            Some("user-1"),
            Some(json!({ "adjustments": [{ "action": "remove_item", "id": "LI-404" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_room_is_rejected_not_stored_as_null_totals() {
        let body = assessment(json!([{
            "id": "R1",
            "name": "Warehouse",
            "area": 1e307,
            "affected_percentage": 100.0
        }]));
        let (status, body) =
            send(&app(), Method::POST, "/estimates", Some("user-1"), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn client_approval_flow() {
        let app = app();
        let (_, created) =
            send(&app, Method::POST, "/estimates", Some("user-1"), Some(bedroom())).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["data"]["status"], "draft");

        let approve = json!({
            "decision": "approve",
            "approver": { "name": "Jordan Lee", "email": "jordan@example.com" },
            "consent": {
                "terms_accepted": true,
                "privacy_accepted": true,
                "scope_acknowledged": true,
                "estimate_disclaimer": true,
                "variation_clause": true,
                "consumer_rights": true
            }
        });

        // drafts cannot be decided on
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/approval", id),
            Some("user-1"),
            Some(approve.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, sent) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/send", id),
            Some("user-1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["data"]["status"], "sent");

        let (status, approved) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/approval", id),
            Some("user-1"),
            Some(approve),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["data"]["status"], "approved");
        assert_eq!(approved["data"]["approvals"][0]["outcome"], "approved");
        assert_eq!(approved["data"]["approvals"][0]["document_version"], 1);

        let (_, fetched) =
            send(&app, Method::GET, &format!("/estimates/{}", id), Some("user-2"), None).await;
        assert_eq!(fetched["data"]["status"], "approved");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/estimates/{}/revisions", id),
            Some("user-1"),
            Some(json!({ "adjustments": [{ "action": "remove_item", "id": "LI-005" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}


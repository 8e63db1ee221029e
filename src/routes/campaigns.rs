use axum::extract::{rejection::QueryRejection, Path, Query, State};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::campaigns::{CampaignFilter, CampaignPortfolioSummary, CampaignResponse};
use crate::error::{ApiError, ApiResult};

/// List campaigns matching the filter
pub async fn list_campaigns(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    filter: Result<Query<CampaignFilter>, QueryRejection>,
    pagination: Result<Query<PaginationParams>, QueryRejection>,
) -> ApiResult<Paginated<CampaignResponse>> {
    let Query(filter) = filter?;
    let Query(pagination) = pagination?;

    tracing::info!(
        user_id = %auth.user_id,
        status = ?filter.status,
        search = ?filter.search_term(),
        page = pagination.page(),
        per_page = pagination.per_page(),
        "Listing campaigns"
    );

    let (campaigns, total) = state.campaigns.list_campaigns(&filter, &pagination).await?;
    let data = campaigns.into_iter().map(CampaignResponse::from).collect();

    Ok(Paginated::new(data, &pagination, total))
}

/// Portfolio totals for the dashboard header
pub async fn campaign_summary(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<CampaignPortfolioSummary>> {
    tracing::info!(user_id = %auth.user_id, "Getting campaign summary");

    let summary = state.campaigns.portfolio_summary().await?;
    Ok(DataResponse::new(summary))
}

/// Get a single campaign
pub async fn get_campaign(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> ApiResult<DataResponse<CampaignResponse>> {
    tracing::info!(user_id = %auth.user_id, campaign_id = %campaign_id, "Getting campaign");

    let campaign = state
        .campaigns
        .get_campaign(campaign_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Campaign {} not found", campaign_id)))?;

    Ok(DataResponse::new(campaign.into()))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, send};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::GET,
            "/campaigns?search=awareness&page=2&per_page=1",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total_items"], 2);
        assert_eq!(body["pagination"]["total_pages"], 2);
        assert_eq!(body["pagination"]["has_next"], false);
        assert_eq!(body["data"][0]["name"], "Mould Awareness Social Campaign");
        assert_eq!(body["data"][0]["remaining_cents"], 12_200_00);

        let (_, active) = send(&app, Method::GET, "/campaigns?status=active", Some("u1"), None).await;
        assert_eq!(active["pagination"]["total_items"], 1);
        assert_eq!(active["data"][0]["ctr"], 4.0);

        let (status, _) = send(&app, Method::GET, "/campaigns?status=bogus", Some("u1"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_and_lookup() {
        let app = app();
        let (status, summary) = send(&app, Method::GET, "/campaigns/summary", Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["data"]["campaign_count"], 3);
        assert_eq!(summary["data"]["total_spent_cents"], 100_300_00);

        let (_, list) = send(&app, Method::GET, "/campaigns", Some("u1"), None).await;
        let id = list["data"][0]["id"].as_str().unwrap();
        let (status, one) =
            send(&app, Method::GET, &format!("/campaigns/{}", id), Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["data"]["id"], id);

        let (status, _) = send(
            &app,
            Method::GET,
            "/campaigns/00000000-0000-0000-0000-000000000000",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

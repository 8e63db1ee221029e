//! Campaign data access.
//!
//! The dashboards only read campaigns, so the repository exposes list, get
//! and summary queries. `PgCampaignRepository` backs production;
//! `InMemoryCampaignRepository` serves local runs and tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::PaginationParams;
use crate::domain::campaigns::{
    ApprovalStatus, Campaign, CampaignBudget, CampaignFilter, CampaignPerformance,
    CampaignPortfolioSummary, CampaignStatus, CampaignType, CostModel,
};

#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// One page of matching campaigns, newest start date first, plus the
    /// total match count
    async fn list_campaigns(
        &self,
        filter: &CampaignFilter,
        pagination: &PaginationParams,
    ) -> Result<(Vec<Campaign>, u64)>;

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>>;

    async fn portfolio_summary(&self) -> Result<CampaignPortfolioSummary>;
}

// ============================================================================
// In-memory
// ============================================================================

pub struct InMemoryCampaignRepository {
    campaigns: Vec<Campaign>,
}

impl InMemoryCampaignRepository {
    pub fn new(mut campaigns: Vec<Campaign>) -> Self {
        campaigns.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(a.name.cmp(&b.name)));
        Self { campaigns }
    }

    /// Repository holding the marketing dashboard fixtures
    pub fn seeded() -> Self {
        Self::new(seed_campaigns())
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn list_campaigns(
        &self,
        filter: &CampaignFilter,
        pagination: &PaginationParams,
    ) -> Result<(Vec<Campaign>, u64)> {
        let matching: Vec<&Campaign> = self.campaigns.iter().filter(|c| filter.matches(c)).collect();
        let total = matching.len() as u64;

        let page = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        Ok(self.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn portfolio_summary(&self) -> Result<CampaignPortfolioSummary> {
        Ok(CampaignPortfolioSummary::from_campaigns(&self.campaigns))
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn timestamp(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date(y, m, d).and_time(chrono::NaiveTime::MIN))
}

/// Fixture ids are stable so links to them survive restarts
fn fixture_id(n: u128) -> Uuid {
    Uuid::from_u128(0x6e72_7000_0000_4000_8000_0000_0000_0000 | n)
}

fn seed_campaigns() -> Vec<Campaign> {
    vec![
        Campaign {
            id: fixture_id(1),
            name: "Q2 Emergency Services Campaign".into(),
            description: "Comprehensive emergency response campaign targeting water and fire damage services across major metropolitan areas.".into(),
            campaign_type: CampaignType::Conversion,
            status: CampaignStatus::Active,
            manager: "Sarah Johnson".into(),
            client: "All Tier Partners".into(),
            budget: CampaignBudget {
                total_cents: 150_000_00,
                daily_cents: 1_500_00,
                spent_cents: 87_500_00,
                currency: "AUD".into(),
                bid_strategy: "Target CPA".into(),
                cost_model: CostModel::Cpa,
            },
            start_date: date(2024, 4, 1),
            end_date: date(2024, 6, 30),
            approval_status: ApprovalStatus::Approved,
            performance: CampaignPerformance {
                impressions: 234_900,
                clicks: 9_396,
                conversions: 294,
                revenue_cents: 882_000_00,
            },
            created_at: timestamp(2024, 3, 15),
            updated_at: timestamp(2024, 3, 20),
        },
        Campaign {
            id: fixture_id(2),
            name: "Commercial Property Awareness - LinkedIn".into(),
            description: "B2B campaign targeting commercial property managers and facility directors.".into(),
            campaign_type: CampaignType::Awareness,
            status: CampaignStatus::Scheduled,
            manager: "Michael Chen".into(),
            client: "Gold Tier Partners".into(),
            budget: CampaignBudget {
                total_cents: 75_000_00,
                daily_cents: 750_00,
                spent_cents: 0,
                currency: "AUD".into(),
                bid_strategy: "Maximum Delivery".into(),
                cost_model: CostModel::Cpm,
            },
            start_date: date(2024, 4, 15),
            end_date: date(2024, 7, 15),
            approval_status: ApprovalStatus::Pending,
            performance: CampaignPerformance::default(),
            created_at: timestamp(2024, 3, 10),
            updated_at: timestamp(2024, 3, 18),
        },
        Campaign {
            id: fixture_id(3),
            name: "Mould Awareness Social Campaign".into(),
            description: "Educational campaign about mould risks and professional remediation services.".into(),
            campaign_type: CampaignType::Awareness,
            status: CampaignStatus::Paused,
            manager: "Lisa Rodriguez".into(),
            client: "Health-focused Contractors".into(),
            budget: CampaignBudget {
                total_cents: 25_000_00,
                daily_cents: 250_00,
                spent_cents: 12_800_00,
                currency: "AUD".into(),
                bid_strategy: "Lowest Cost".into(),
                cost_model: CostModel::Cpc,
            },
            start_date: date(2024, 2, 1),
            end_date: date(2024, 4, 30),
            approval_status: ApprovalStatus::Approved,
            performance: CampaignPerformance {
                impressions: 67_800,
                clicks: 1_356,
                conversions: 30,
                revenue_cents: 75_000_00,
            },
            created_at: timestamp(2024, 1, 15),
            updated_at: timestamp(2024, 3, 10),
        },
    ]
}

// ============================================================================
// Postgres
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    id: Uuid,
    name: String,
    description: String,
    campaign_type: CampaignType,
    status: CampaignStatus,
    manager: String,
    client: String,
    budget_total: Decimal,
    budget_daily: Decimal,
    budget_spent: Decimal,
    currency: String,
    bid_strategy: String,
    cost_model: CostModel,
    start_date: NaiveDate,
    end_date: NaiveDate,
    approval_status: ApprovalStatus,
    impressions: i64,
    clicks: i64,
    conversions: i64,
    revenue: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn to_cents(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .with_context(|| format!("Amount out of range: {}", amount))
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = anyhow::Error;

    fn try_from(row: CampaignRow) -> Result<Self> {
        Ok(Campaign {
            id: row.id,
            name: row.name,
            description: row.description,
            campaign_type: row.campaign_type,
            status: row.status,
            manager: row.manager,
            client: row.client,
            budget: CampaignBudget {
                total_cents: to_cents(row.budget_total)?,
                daily_cents: to_cents(row.budget_daily)?,
                spent_cents: to_cents(row.budget_spent)?,
                currency: row.currency,
                bid_strategy: row.bid_strategy,
                cost_model: row.cost_model,
            },
            start_date: row.start_date,
            end_date: row.end_date,
            approval_status: row.approval_status,
            performance: CampaignPerformance {
                impressions: row.impressions,
                clicks: row.clicks,
                conversions: row.conversions,
                revenue_cents: to_cents(row.revenue)?,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    campaign_count: i64,
    active_count: i64,
    pending_approval_count: i64,
    total_budget: Decimal,
    total_spent: Decimal,
}

const CAMPAIGN_COLUMNS: &str = r#"
    id, name, description, campaign_type, status, manager, client,
    budget_total, budget_daily, budget_spent, currency, bid_strategy,
    cost_model, start_date, end_date, approval_status, impressions, clicks,
    conversions, revenue, created_at, updated_at
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR status = $1)
    AND ($2::text IS NULL OR approval_status = $2)
    AND ($3::text IS NULL OR name ILIKE $3 OR description ILIKE $3)
"#;

pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn list_campaigns(
        &self,
        filter: &CampaignFilter,
        pagination: &PaginationParams,
    ) -> Result<(Vec<Campaign>, u64)> {
        let search = filter.search_term().map(|t| like_pattern(&t));

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM campaigns {}", FILTER_CLAUSE))
            .bind(filter.status)
            .bind(filter.approval_status)
            .bind(&search)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count campaigns")?;

        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {} FROM campaigns {} ORDER BY start_date DESC, name LIMIT $4 OFFSET $5",
            CAMPAIGN_COLUMNS, FILTER_CLAUSE
        ))
        .bind(filter.status)
        .bind(filter.approval_status)
        .bind(&search)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list campaigns")?;

        let campaigns = rows
            .into_iter()
            .map(Campaign::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((campaigns, total.max(0) as u64))
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {} FROM campaigns WHERE id = $1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch campaign")?;

        row.map(Campaign::try_from).transpose()
    }

    async fn portfolio_summary(&self) -> Result<CampaignPortfolioSummary> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT COUNT(*) AS campaign_count,
                   COUNT(*) FILTER (WHERE status = 'active') AS active_count,
                   COUNT(*) FILTER (WHERE approval_status = 'pending') AS pending_approval_count,
                   COALESCE(SUM(budget_total), 0) AS total_budget,
                   COALESCE(SUM(budget_spent), 0) AS total_spent
            FROM campaigns
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to summarise campaigns")?;

        Ok(CampaignPortfolioSummary {
            campaign_count: row.campaign_count.max(0) as u64,
            active_count: row.active_count.max(0) as u64,
            pending_approval_count: row.pending_approval_count.max(0) as u64,
            total_budget_cents: to_cents(row.total_budget)?,
            total_spent_cents: to_cents(row.total_spent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, per_page: u32) -> PaginationParams {
        PaginationParams {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_with_total() {
        let repo = InMemoryCampaignRepository::seeded();
        let (campaigns, total) = repo
            .list_campaigns(&CampaignFilter::default(), &PaginationParams::default())
            .await
            .unwrap();

        assert_eq!(total, 3);
        let names: Vec<&str> = campaigns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Commercial Property Awareness - LinkedIn",
                "Q2 Emergency Services Campaign",
                "Mould Awareness Social Campaign",
            ]
        );
    }

    #[tokio::test]
    async fn pagination_slices_after_filtering() {
        let repo = InMemoryCampaignRepository::seeded();
        let filter = CampaignFilter {
            search: Some("awareness".into()),
            ..Default::default()
        };

        let (first, total) = repo.list_campaigns(&filter, &page(1, 1)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "Commercial Property Awareness - LinkedIn");

        let (second, _) = repo.list_campaigns(&filter, &page(2, 1)).await.unwrap();
        assert_eq!(second[0].name, "Mould Awareness Social Campaign");

        let (past_end, total) = repo.list_campaigns(&filter, &page(3, 1)).await.unwrap();
        assert!(past_end.is_empty());
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn status_filter_and_lookup() {
        let repo = InMemoryCampaignRepository::seeded();
        let filter = CampaignFilter {
            status: Some(CampaignStatus::Paused),
            ..Default::default()
        };
        let (paused, total) = repo
            .list_campaigns(&filter, &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);

        let found = repo.get_campaign(paused[0].id).await.unwrap().unwrap();
        assert_eq!(found.manager, "Lisa Rodriguez");
        assert!(repo.get_campaign(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_matches_dashboard_header() {
        let summary = InMemoryCampaignRepository::seeded()
            .portfolio_summary()
            .await
            .unwrap();
        assert_eq!(summary.campaign_count, 3);
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.pending_approval_count, 1);
        assert_eq!(summary.total_budget_cents, 250_000_00);
        assert_eq!(summary.total_spent_cents, 100_300_00);
    }

    #[test]
    fn decimal_amounts_convert_to_cents() {
        assert_eq!(to_cents(Decimal::new(1234567, 2)).unwrap(), 1_234_567);
        assert_eq!(to_cents(Decimal::new(4, 3)).unwrap(), 0);
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}

//! Marketing campaign domain types
//!
//! Campaign records back the partner marketing dashboards. Money is held in
//! cents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::pricing::round2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Active,
    Paused,
    Completed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Active => write!(f, "active"),
            CampaignStatus::Paused => write!(f, "paused"),
            CampaignStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum CampaignType {
    Awareness,
    Conversion,
    Retargeting,
    Seasonal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum CostModel {
    #[serde(rename = "CPC")]
    #[sqlx(rename = "CPC")]
    Cpc,
    #[serde(rename = "CPM")]
    #[sqlx(rename = "CPM")]
    Cpm,
    #[serde(rename = "CPA")]
    #[sqlx(rename = "CPA")]
    Cpa,
    #[serde(rename = "ROAS")]
    #[sqlx(rename = "ROAS")]
    Roas,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBudget {
    pub total_cents: i64,
    pub daily_cents: i64,
    pub spent_cents: i64,
    pub currency: String,
    pub bid_strategy: String,
    pub cost_model: CostModel,
}

impl CampaignBudget {
    pub fn remaining_cents(&self) -> i64 {
        (self.total_cents - self.spent_cents).max(0)
    }

    /// Spent share of the total budget, in percent
    pub fn utilisation(&self) -> Option<f64> {
        if self.total_cents <= 0 {
            return None;
        }
        Some(round2(self.spent_cents as f64 / self.total_cents as f64 * 100.0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CampaignPerformance {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub revenue_cents: i64,
}

impl CampaignPerformance {
    /// Click-through rate, in percent
    pub fn ctr(&self) -> Option<f64> {
        if self.impressions <= 0 {
            return None;
        }
        Some(round2(self.clicks as f64 / self.impressions as f64 * 100.0))
    }

    /// Cost per acquisition, in cents
    pub fn cpa_cents(&self, spent_cents: i64) -> Option<i64> {
        if self.conversions <= 0 {
            return None;
        }
        Some(spent_cents / self.conversions)
    }
}

/// Campaign entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub manager: String,
    pub client: String,
    pub budget: CampaignBudget,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approval_status: ApprovalStatus,
    pub performance: CampaignPerformance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters / repository filter for campaign lists
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CampaignFilter {
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default)]
    pub search: Option<String>,
}

impl CampaignFilter {
    /// Normalized search term, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, campaign: &Campaign) -> bool {
        if self.status.is_some_and(|s| s != campaign.status) {
            return false;
        }
        if self
            .approval_status
            .is_some_and(|s| s != campaign.approval_status)
        {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                campaign.name.to_lowercase().contains(&term)
                    || campaign.description.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Response DTO for campaign
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub manager: String,
    pub client: String,
    pub budget: CampaignBudget,
    pub remaining_cents: i64,
    pub budget_utilisation: Option<f64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub approval_status: ApprovalStatus,
    pub performance: CampaignPerformance,
    pub ctr: Option<f64>,
    pub cpa_cents: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        let remaining_cents = c.budget.remaining_cents();
        let budget_utilisation = c.budget.utilisation();
        let ctr = c.performance.ctr();
        let cpa_cents = c.performance.cpa_cents(c.budget.spent_cents);

        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            campaign_type: c.campaign_type,
            status: c.status,
            manager: c.manager,
            client: c.client,
            budget: c.budget,
            remaining_cents,
            budget_utilisation,
            start_date: c.start_date,
            end_date: c.end_date,
            approval_status: c.approval_status,
            performance: c.performance,
            ctr,
            cpa_cents,
            updated_at: c.updated_at,
        }
    }
}

/// Dashboard header totals
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct CampaignPortfolioSummary {
    pub campaign_count: u64,
    pub active_count: u64,
    pub pending_approval_count: u64,
    pub total_budget_cents: i64,
    pub total_spent_cents: i64,
}

impl CampaignPortfolioSummary {
    pub fn from_campaigns<'a>(campaigns: impl IntoIterator<Item = &'a Campaign>) -> Self {
        campaigns
            .into_iter()
            .fold(Self::default(), |mut acc, c| {
                acc.campaign_count += 1;
                if c.status == CampaignStatus::Active {
                    acc.active_count += 1;
                }
                if c.approval_status == ApprovalStatus::Pending {
                    acc.pending_approval_count += 1;
                }
                acc.total_budget_cents += c.budget.total_cents;
                acc.total_spent_cents += c.budget.spent_cents;
                acc
            })
    }
}

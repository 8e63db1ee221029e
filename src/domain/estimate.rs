//! Job estimate domain types
//!
//! A `JobEstimate` is produced in one piece from a `SiteAssessment` and is
//! never patched in place: revisions replace the whole object with a new
//! version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::assessment::SiteAssessment;

/// Line item category, in display order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LineItemCategory {
    EmergencyServices,
    Labour,
    Equipment,
    Materials,
    Disposal,
    Cleaning,
    Restoration,
}

impl fmt::Display for LineItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineItemCategory::EmergencyServices => write!(f, "emergency_services"),
            LineItemCategory::Labour => write!(f, "labour"),
            LineItemCategory::Equipment => write!(f, "equipment"),
            LineItemCategory::Materials => write!(f, "materials"),
            LineItemCategory::Disposal => write!(f, "disposal"),
            LineItemCategory::Cleaning => write!(f, "cleaning"),
            LineItemCategory::Restoration => write!(f, "restoration"),
        }
    }
}

/// Where the selected unit price came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    NrpGuideline,
    ContractorRate,
    IndustryAverage,
    Custom,
}

/// Per-unit reference prices for a line item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceReference {
    pub nrp_guideline: f64,
    pub contractor_rate: f64,
    pub industry_average: f64,
    /// Selected unit price against the guideline, in percent.
    /// `None` when there is no guideline price.
    pub variance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineItemWarning {
    /// Equipment type missing from the rate table; the default rate was used
    DefaultEquipmentRate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardReference {
    pub standard: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateLineItem {
    pub id: String,
    pub category: LineItemCategory,
    pub item_code: String,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub total_price: f64,
    pub source: PriceSource,
    pub price_comparison: PriceReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<StandardReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LineItemWarning>,
}

/// Aggregate totals, always recomputed from the full line item set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EstimateTotals {
    pub subtotal: f64,
    pub equipment_total: f64,
    pub labour_total: f64,
    pub materials_total: f64,
    pub category_totals: BTreeMap<LineItemCategory, f64>,
    pub contingency: f64,
    pub taxable_amount: f64,
    pub gst: f64,
    pub total: f64,
    pub balance_due: f64,
}

/// Per-category comparison against reference price guides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryComparison {
    pub category: LineItemCategory,
    pub nrp_total: f64,
    pub contractor_total: f64,
    pub industry_average: f64,
    pub selected_price: f64,
    /// `None` when the guideline total is zero
    pub variance: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    #[default]
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
}

impl fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateStatus::Draft => write!(f, "draft"),
            EstimateStatus::Sent => write!(f, "sent"),
            EstimateStatus::Approved => write!(f, "approved"),
            EstimateStatus::Rejected => write!(f, "rejected"),
            EstimateStatus::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstimateType {
    Initial,
    Revised,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationParameter {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationFormula {
    pub name: String,
    pub expression: String,
    pub result: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContingencyPolicy {
    pub percentage: f64,
    pub amount: f64,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationRecord {
    pub method: String,
    pub parameters: Vec<CalculationParameter>,
    pub formulas: Vec<CalculationFormula>,
    pub assumptions: Vec<String>,
    pub contingency: ContingencyPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopePhase {
    pub phase: u32,
    pub name: String,
    pub description: String,
    pub tasks: Vec<String>,
    /// Days
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<u32>,
    pub milestones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePhase {
    pub phase: u32,
    pub start_day: u32,
    pub end_day: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub estimated_duration: u32,
    pub phases: Vec<TimelinePhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scope {
    pub summary: String,
    pub phases: Vec<ScopePhase>,
    pub exclusions: Vec<String>,
    pub assumptions: Vec<String>,
    pub timeline: Timeline,
    pub deliverables: Vec<String>,
    pub quality_standards: Vec<String>,
    pub safety_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceFlags {
    pub australian_consumer_law: bool,
    pub fair_trading: bool,
    pub building_codes: Vec<String>,
    pub insurance_requirements: Vec<String>,
    pub environmental_standards: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Standard,
    Highlighted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisclaimerSection {
    pub title: String,
    pub content: String,
    pub emphasis: Emphasis,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Disclaimer {
    pub text: String,
    pub sections: Vec<DisclaimerSection>,
    pub legal_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateMetadata {
    pub created_by: String,
    pub last_modified_by: String,
    pub tags: Vec<String>,
    pub compliance: ComplianceFlags,
    pub disclaimer: Disclaimer,
}

/// Aggregate root for a generated estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEstimate {
    pub id: Uuid,
    pub job_id: String,
    pub estimate_number: String,
    pub version: u32,
    pub status: EstimateStatus,
    #[serde(rename = "type")]
    pub estimate_type: EstimateType,
    pub assessment: SiteAssessment,
    pub line_items: Vec<EstimateLineItem>,
    pub calculations: CalculationRecord,
    pub totals: EstimateTotals,
    pub comparisons: Vec<CategoryComparison>,
    pub scope: Scope,
    pub metadata: EstimateMetadata,
    /// Client decisions, oldest first
    #[serde(default)]
    pub approvals: Vec<EstimateApproval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl JobEstimate {
    /// Mark a draft or sent estimate expired once `valid_until` has
    /// passed. Returns whether the status changed.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        let open = matches!(self.status, EstimateStatus::Draft | EstimateStatus::Sent);
        if open && now >= self.valid_until {
            self.status = EstimateStatus::Expired;
            self.updated_at = now;
            return true;
        }
        false
    }
}

/// What the client chose to do with a sent estimate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
    RequestRevision,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
    /// Sent back for changes
    Conditional,
}

/// Acknowledgements the client gives before approving
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LegalConsent {
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub privacy_accepted: bool,
    #[serde(default)]
    pub scope_acknowledged: bool,
    #[serde(default)]
    pub estimate_disclaimer: bool,
    #[serde(default)]
    pub variation_clause: bool,
    #[serde(default)]
    pub consumer_rights: bool,
}

impl LegalConsent {
    pub fn all_given(&self) -> bool {
        self.terms_accepted
            && self.privacy_accepted
            && self.scope_acknowledged
            && self.estimate_disclaimer
            && self.variation_clause
            && self.consumer_rights
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Approver {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// A recorded client decision on one version of an estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateApproval {
    pub id: Uuid,
    pub outcome: ApprovalOutcome,
    pub approver: Approver,
    pub comments: Option<String>,
    pub consent: LegalConsent,
    pub document_version: u32,
    pub decided_at: DateTime<Utc>,
}

/// An edit applied when revising an estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LineItemAdjustment {
    UpdateItem {
        id: String,
        #[serde(default)]
        quantity: Option<f64>,
        #[serde(default)]
        unit_price: Option<f64>,
        #[serde(default)]
        description: Option<String>,
    },
    RemoveItem {
        id: String,
    },
    AddCustomItem {
        category: LineItemCategory,
        description: String,
        quantity: f64,
        #[serde(default)]
        unit: String,
        unit_price: f64,
    },
}

/// Request DTO for generating an estimate
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateEstimateRequest {
    #[serde(default)]
    pub job_id: Option<String>,
    pub assessment: SiteAssessment,
}

/// Request DTO for revising an estimate
#[derive(Debug, Clone, Deserialize)]
pub struct ReviseEstimateRequest {
    pub adjustments: Vec<LineItemAdjustment>,
}

/// Request DTO for recording a client decision
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRequest {
    pub decision: ApprovalDecision,
    pub approver: Approver,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub consent: LegalConsent,
}

/// Query parameters for listing line items
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LineItemQuery {
    #[serde(default)]
    pub category: Option<LineItemCategory>,
}

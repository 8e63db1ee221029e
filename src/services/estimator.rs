//! Estimate generation engine.
//!
//! Turns a site assessment into priced line items, totals and price-guide
//! comparisons. Everything here is a pure computation over its inputs; the
//! caller decides whether to store the result.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    ApprovalDecision, ApprovalOutcome, ApprovalRequest, CalculationFormula,
    CalculationParameter, CalculationRecord, CategoryComparison, ComplianceFlags,
    ContingencyPolicy, Disclaimer, DisclaimerSection, Emphasis, EstimateApproval,
    EstimateLineItem, EstimateMetadata, EstimateStatus, EstimateTotals, EstimateType, JobEstimate,
    LineItemAdjustment, LineItemCategory, LineItemWarning, PriceReference, PriceSource, Room,
    Scope, ScopePhase, SiteAssessment, StandardReference, Timeline, TimelinePhase,
};
use crate::services::pricing::{
    percent_variance, round2, PricingTable, Rate, CONTINGENCY_RATE, GST_RATE,
};

const DEFAULT_DRYING_DAYS: u32 = 3;
/// Upper bounds on assessment inputs, in m², units and days
const MAX_ROOM_AREA: f64 = 100_000.0;
const MAX_EQUIPMENT_QUANTITY: f64 = 1_000.0;
const MAX_HIRE_DAYS: f64 = 365.0;
const CUSTOM_ID_PREFIX: &str = "LI-CUSTOM-";

#[derive(Debug, Error, PartialEq)]
pub enum EstimateError {
    #[error("site assessment must contain at least one room")]
    NoRooms,

    #[error("room '{room}': {reason}")]
    InvalidRoom { room: String, reason: String },

    #[error("equipment '{equipment}' in room '{room}': {reason}")]
    InvalidEquipment {
        room: String,
        equipment: String,
        reason: String,
    },

    #[error("line item not found: {0}")]
    UnknownLineItem(String),

    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("amount out of range: {0}")]
    OutOfRange(String),

    #[error("cannot {action} an estimate that is {from}")]
    InvalidTransition {
        from: EstimateStatus,
        action: &'static str,
    },

    #[error("invalid approval: {0}")]
    InvalidApproval(String),
}

/// Generates and revises job estimates against a pricing table
#[derive(Debug, Clone)]
pub struct Estimator {
    pricing: PricingTable,
    validity: Duration,
}

impl Estimator {
    pub fn new(pricing: PricingTable, validity_days: u32) -> Self {
        Self {
            pricing,
            validity: Duration::days(i64::from(validity_days)),
        }
    }

    /// `GenerateEstimate(assessment) -> JobEstimate`
    pub fn generate(
        &self,
        assessment: SiteAssessment,
        job_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<JobEstimate, EstimateError> {
        let line_items = generate_line_items(&assessment, &self.pricing)?;
        let totals = calculate_totals(&line_items);
        ensure_finite(&line_items, &totals)?;
        let comparisons = generate_comparisons(&line_items);
        let calculations = self.calculation_record(&assessment, &totals);
        let scope = build_scope(&assessment);
        let metadata = build_metadata(&assessment);

        tracing::debug!(
            assessment_id = %assessment.id,
            line_items = line_items.len(),
            subtotal = totals.subtotal,
            total = totals.total,
            "Estimate generated"
        );

        Ok(JobEstimate {
            id: Uuid::new_v4(),
            job_id: job_id.unwrap_or_else(|| assessment.id.clone()),
            estimate_number: format!("EST-{}", now.timestamp_millis()),
            version: 1,
            status: EstimateStatus::Draft,
            estimate_type: EstimateType::Initial,
            assessment,
            line_items,
            calculations,
            totals,
            comparisons,
            scope,
            metadata,
            approvals: Vec::new(),
            created_at: now,
            updated_at: now,
            valid_until: now + self.validity,
        })
    }

    /// Apply line item adjustments and return the next version of the
    /// estimate. Totals and comparisons are recomputed from scratch.
    pub fn revise(
        &self,
        previous: &JobEstimate,
        adjustments: &[LineItemAdjustment],
        modified_by: &str,
        now: DateTime<Utc>,
    ) -> Result<JobEstimate, EstimateError> {
        if previous.status == EstimateStatus::Approved {
            return Err(EstimateError::InvalidTransition {
                from: previous.status,
                action: "revise",
            });
        }
        if adjustments.is_empty() {
            return Err(EstimateError::InvalidAdjustment(
                "at least one adjustment is required".to_string(),
            ));
        }

        let mut line_items = previous.line_items.clone();
        for adjustment in adjustments {
            apply_adjustment(&mut line_items, adjustment)?;
        }

        let totals = calculate_totals(&line_items);
        ensure_finite(&line_items, &totals)?;
        let comparisons = generate_comparisons(&line_items);

        let mut next = previous.clone();
        next.version = previous.version + 1;
        next.estimate_type = EstimateType::Revised;
        next.status = EstimateStatus::Draft;
        next.calculations.contingency.amount = totals.contingency;
        next.line_items = line_items;
        next.totals = totals;
        next.comparisons = comparisons;
        next.metadata.last_modified_by = modified_by.to_string();
        next.updated_at = now;
        next.valid_until = now + self.validity;

        Ok(next)
    }

    /// Issue a draft estimate to the client
    pub fn send(
        &self,
        previous: &JobEstimate,
        sent_by: &str,
        now: DateTime<Utc>,
    ) -> Result<JobEstimate, EstimateError> {
        let mut next = previous.clone();
        next.expire_if_due(now);
        if next.status != EstimateStatus::Draft {
            return Err(EstimateError::InvalidTransition {
                from: next.status,
                action: "send",
            });
        }

        next.status = EstimateStatus::Sent;
        next.metadata.last_modified_by = sent_by.to_string();
        next.updated_at = now;
        Ok(next)
    }

    /// Record the client's decision on a sent estimate.
    ///
    /// Approval needs every consent; rejecting or asking for a revision
    /// needs comments. A revision request returns the estimate to draft.
    pub fn decide(
        &self,
        previous: &JobEstimate,
        request: ApprovalRequest,
        now: DateTime<Utc>,
    ) -> Result<JobEstimate, EstimateError> {
        let mut next = previous.clone();
        next.expire_if_due(now);
        if next.status != EstimateStatus::Sent {
            return Err(EstimateError::InvalidTransition {
                from: next.status,
                action: "decide on",
            });
        }

        let approver = &request.approver;
        if approver.name.trim().is_empty() {
            return Err(EstimateError::InvalidApproval(
                "approver name is required".to_string(),
            ));
        }
        if !approver.email.contains('@') {
            return Err(EstimateError::InvalidApproval(format!(
                "approver email is not valid (got '{}')",
                approver.email
            )));
        }

        let comments = request
            .comments
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let (outcome, status) = match request.decision {
            ApprovalDecision::Approve => {
                if !request.consent.all_given() {
                    return Err(EstimateError::InvalidApproval(
                        "all legal consents must be given to approve".to_string(),
                    ));
                }
                (ApprovalOutcome::Approved, EstimateStatus::Approved)
            }
            ApprovalDecision::Reject => (ApprovalOutcome::Rejected, EstimateStatus::Rejected),
            ApprovalDecision::RequestRevision => {
                (ApprovalOutcome::Conditional, EstimateStatus::Draft)
            }
        };
        if outcome != ApprovalOutcome::Approved && comments.is_none() {
            return Err(EstimateError::InvalidApproval(
                "comments are required when rejecting or requesting a revision".to_string(),
            ));
        }

        next.approvals.push(EstimateApproval {
            id: Uuid::new_v4(),
            outcome,
            approver: request.approver,
            comments,
            consent: request.consent,
            document_version: previous.version,
            decided_at: now,
        });
        next.status = status;
        next.updated_at = now;
        Ok(next)
    }

    fn calculation_record(
        &self,
        assessment: &SiteAssessment,
        totals: &EstimateTotals,
    ) -> CalculationRecord {
        let damage = &assessment.damage_assessment;
        let affected_area = assessment.total_affected_area();
        let factor = self.pricing.labour_factor(damage.category);
        let total_area = assessment
            .property_details
            .total_area
            .unwrap_or_else(|| assessment.rooms().iter().map(|r| r.area).sum());

        let parameter = |name: &str, value: f64, unit: &str, source: &str| CalculationParameter {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            source: source.to_string(),
        };

        CalculationRecord {
            method: "iicrc_standard".to_string(),
            parameters: vec![
                parameter("Total Area", total_area, "sqm", "Assessment"),
                parameter("Affected Area", round2(affected_area), "sqm", "Calculated"),
                parameter(
                    "Water Category",
                    f64::from(damage.category.number()),
                    "",
                    "IICRC S500",
                ),
                parameter("Water Class", f64::from(damage.class.number()), "", "IICRC S500"),
            ],
            formulas: vec![
                CalculationFormula {
                    name: "Labour Hours".to_string(),
                    expression: format!(
                        "Affected Area × {} ({} factor)",
                        factor, damage.category
                    ),
                    result: labour_hours(affected_area, factor),
                    unit: "hours".to_string(),
                },
                CalculationFormula {
                    name: "Equipment Days".to_string(),
                    expression: "Longest equipment hire across affected rooms".to_string(),
                    result: f64::from(drying_days(assessment.rooms())),
                    unit: "days".to_string(),
                },
            ],
            assumptions: strings(&[
                "Normal drying conditions",
                "No structural drying required",
                "Standard business hours labour rate applied",
            ]),
            contingency: ContingencyPolicy {
                percentage: CONTINGENCY_RATE * 100.0,
                amount: totals.contingency,
                justification: "Standard contingency for unforeseen complications".to_string(),
            },
        }
    }
}

fn validate(assessment: &SiteAssessment) -> Result<(), EstimateError> {
    let rooms = assessment.rooms();
    if rooms.is_empty() {
        return Err(EstimateError::NoRooms);
    }

    for room in rooms {
        let invalid = |reason: String| EstimateError::InvalidRoom {
            room: room.name.clone(),
            reason,
        };
        if !room.area.is_finite() || room.area < 0.0 {
            return Err(invalid(format!("area must be a non-negative number (got {})", room.area)));
        }
        if room.area > MAX_ROOM_AREA {
            return Err(invalid(format!(
                "area must not exceed {} m² (got {})",
                MAX_ROOM_AREA, room.area
            )));
        }
        if !(0.0..=100.0).contains(&room.affected_percentage) {
            return Err(invalid(format!(
                "affected percentage must be between 0 and 100 (got {})",
                room.affected_percentage
            )));
        }

        for eq in &room.equipment {
            let invalid = |reason: String| EstimateError::InvalidEquipment {
                room: room.name.clone(),
                equipment: eq.equipment_type.clone(),
                reason,
            };
            if eq.equipment_type.trim().is_empty() {
                return Err(invalid("equipment type is required".to_string()));
            }
            if !eq.quantity.is_finite() || eq.quantity < 0.0 {
                return Err(invalid(format!("quantity must be non-negative (got {})", eq.quantity)));
            }
            if !eq.duration.is_finite() || eq.duration < 0.0 {
                return Err(invalid(format!("duration must be non-negative (got {})", eq.duration)));
            }
            if eq.quantity > MAX_EQUIPMENT_QUANTITY {
                return Err(invalid(format!(
                    "quantity must not exceed {} (got {})",
                    MAX_EQUIPMENT_QUANTITY, eq.quantity
                )));
            }
            if eq.duration > MAX_HIRE_DAYS {
                return Err(invalid(format!(
                    "duration must not exceed {} days (got {})",
                    MAX_HIRE_DAYS, eq.duration
                )));
            }
        }
    }

    Ok(())
}

/// Every quantity and amount must serialise as a number
fn ensure_finite(items: &[EstimateLineItem], totals: &EstimateTotals) -> Result<(), EstimateError> {
    if let Some(item) = items
        .iter()
        .find(|i| !i.quantity.is_finite() || !i.total_price.is_finite())
    {
        return Err(EstimateError::OutOfRange(format!(
            "line item {} has a quantity or total that is not a finite number",
            item.id
        )));
    }
    if !totals.total.is_finite() {
        return Err(EstimateError::OutOfRange(
            "estimate total is not a finite number".to_string(),
        ));
    }
    Ok(())
}

/// Round a derived quantity up to a whole unit, ignoring float noise below
/// one millionth.
fn ceil_units(value: f64) -> f64 {
    ((value * 1e6).round() / 1e6).ceil()
}

fn labour_hours(affected_area: f64, factor: f64) -> f64 {
    ceil_units(affected_area * factor)
}

/// Longest equipment hire across all rooms, rounded up to whole days
fn drying_days(rooms: &[Room]) -> u32 {
    let longest = rooms
        .iter()
        .flat_map(|r| r.equipment.iter())
        .map(|e| e.duration)
        .fold(0.0_f64, f64::max);

    if longest <= 0.0 {
        DEFAULT_DRYING_DAYS
    } else {
        ceil_units(longest) as u32
    }
}

struct ItemTemplate<'a> {
    id: &'a str,
    category: LineItemCategory,
    item_code: &'a str,
    description: &'a str,
    unit: &'a str,
    source: PriceSource,
}

fn priced_item(template: ItemTemplate<'_>, quantity: f64, rate: &Rate) -> EstimateLineItem {
    EstimateLineItem {
        id: template.id.to_string(),
        category: template.category,
        item_code: template.item_code.to_string(),
        description: template.description.to_string(),
        quantity,
        unit: template.unit.to_string(),
        unit_price: rate.unit_price,
        total_price: round2(quantity * rate.unit_price),
        source: template.source,
        price_comparison: rate.reference(),
        notes: None,
        standard: None,
        warnings: Vec::new(),
    }
}

fn iicrc(code: &str, description: impl Into<String>) -> Option<StandardReference> {
    Some(StandardReference {
        standard: "IICRC".to_string(),
        code: code.to_string(),
        description: description.into(),
    })
}

/// Derive the ordered line items for an assessment.
///
/// Emergency call-out first, then labour, one equipment item per room and
/// equipment entry, then materials and disposal.
pub fn generate_line_items(
    assessment: &SiteAssessment,
    pricing: &PricingTable,
) -> Result<Vec<EstimateLineItem>, EstimateError> {
    validate(assessment)?;

    let damage = &assessment.damage_assessment;
    let affected_area = assessment.total_affected_area();
    let hours = labour_hours(affected_area, pricing.labour_factor(damage.category));
    let mut items = Vec::new();

    let mut callout = priced_item(
        ItemTemplate {
            id: "LI-001",
            category: LineItemCategory::EmergencyServices,
            item_code: "ES-001",
            description: "Initial On-Site Assessment (First 2 hours, any time/day)",
            unit: "fixed",
            source: PriceSource::NrpGuideline,
        },
        1.0,
        &pricing.emergency_callout,
    );
    callout.standard = iicrc("S500", "Standard for Professional Water Damage Restoration");
    items.push(callout);

    let mut lead = priced_item(
        ItemTemplate {
            id: "LI-002",
            category: LineItemCategory::Labour,
            item_code: "LAB-001",
            description: "Lead Technician - Water Damage Restoration",
            unit: "hour",
            source: PriceSource::ContractorRate,
        },
        hours,
        &pricing.lead_technician_hourly,
    );
    lead.standard = iicrc(
        "S500-2021",
        format!("{} water damage restoration", damage.category),
    );
    items.push(lead);

    items.push(priced_item(
        ItemTemplate {
            id: "LI-003",
            category: LineItemCategory::Labour,
            item_code: "LAB-002",
            description: "Restoration Technician - Assistant",
            unit: "hour",
            source: PriceSource::ContractorRate,
        },
        hours,
        &pricing.assistant_hourly,
    ));

    for room in assessment.rooms() {
        for (index, eq) in room.equipment.iter().enumerate() {
            let equipment_type = eq.equipment_type.trim();
            let rate = pricing.equipment_rate(equipment_type);
            let quantity = eq.quantity * eq.duration;

            if rate.is_default {
                tracing::warn!(
                    equipment_type = %equipment_type,
                    room = %room.name,
                    default_rate = rate.daily_rate,
                    "Unknown equipment type, using default rate"
                );
            }

            items.push(EstimateLineItem {
                id: format!("LI-EQ-{}-{}", room.id, index),
                category: LineItemCategory::Equipment,
                item_code: format!("EQ-{}", equipment_type.replace(' ', "-")),
                description: format!("{} - {}", equipment_type, room.name),
                quantity,
                unit: "day".to_string(),
                unit_price: rate.daily_rate,
                total_price: round2(quantity * rate.daily_rate),
                source: PriceSource::NrpGuideline,
                price_comparison: rate.reference(),
                notes: eq.purpose.clone(),
                standard: iicrc(
                    "S500",
                    format!("Equipment for {} water damage", damage.class),
                ),
                warnings: if rate.is_default {
                    vec![LineItemWarning::DefaultEquipmentRate]
                } else {
                    Vec::new()
                },
            });
        }
    }

    items.push(priced_item(
        ItemTemplate {
            id: "LI-004",
            category: LineItemCategory::Materials,
            item_code: "MAT-001",
            description: "Antimicrobial Treatment - All affected areas",
            unit: "application",
            source: PriceSource::NrpGuideline,
        },
        ceil_units(affected_area / pricing.area_per_application),
        &pricing.antimicrobial_application,
    ));

    items.push(priced_item(
        ItemTemplate {
            id: "LI-005",
            category: LineItemCategory::Disposal,
            item_code: "DISP-001",
            description: "Waste/Spoil Removal - Contaminated materials",
            unit: "m³",
            source: PriceSource::NrpGuideline,
        },
        ceil_units(affected_area / pricing.area_per_waste_unit),
        &pricing.waste_removal_cubic_metre,
    ));

    Ok(items)
}

/// Sum line items into totals, contingency and GST.
///
/// Contingency and GST are rounded to cents; `taxable_amount` and `total`
/// are exact sums of their parts.
pub fn calculate_totals(items: &[EstimateLineItem]) -> EstimateTotals {
    let mut category_totals: BTreeMap<LineItemCategory, f64> = BTreeMap::new();
    for item in items {
        *category_totals.entry(item.category).or_insert(0.0) += item.total_price;
    }

    let category_total = |c: LineItemCategory| category_totals.get(&c).copied().unwrap_or(0.0);
    let equipment_total = category_total(LineItemCategory::Equipment);
    let labour_total = category_total(LineItemCategory::Labour);
    let materials_total = category_total(LineItemCategory::Materials);

    let subtotal: f64 = items.iter().map(|i| i.total_price).sum();
    let contingency = round2(subtotal * CONTINGENCY_RATE);
    let taxable_amount = subtotal + contingency;
    let gst = round2(taxable_amount * GST_RATE);
    let total = taxable_amount + gst;

    EstimateTotals {
        subtotal,
        equipment_total,
        labour_total,
        materials_total,
        category_totals,
        contingency,
        taxable_amount,
        gst,
        total,
        balance_due: total,
    }
}

/// Group line items by category and compare the selected prices with the
/// reference price guides.
///
/// The per-unit reference prices of each item are summed as they are. A
/// category with no guideline total gets a `None` variance.
pub fn generate_comparisons(items: &[EstimateLineItem]) -> Vec<CategoryComparison> {
    #[derive(Default)]
    struct Acc {
        nrp: f64,
        contractor: f64,
        industry: f64,
        selected: f64,
    }

    let mut by_category: BTreeMap<LineItemCategory, Acc> = BTreeMap::new();
    for item in items {
        let acc = by_category.entry(item.category).or_default();
        let reference = &item.price_comparison;
        acc.nrp += reference.nrp_guideline;
        acc.contractor += reference.contractor_rate;
        acc.industry += reference.industry_average;
        acc.selected += item.total_price;
    }

    by_category
        .into_iter()
        .map(|(category, acc)| {
            let nrp_total = round2(acc.nrp);
            let selected_price = round2(acc.selected);
            CategoryComparison {
                category,
                nrp_total,
                contractor_total: round2(acc.contractor),
                industry_average: round2(acc.industry),
                selected_price,
                variance: percent_variance(selected_price, nrp_total),
            }
        })
        .collect()
}

fn check_amount(field: &str, value: f64) -> Result<f64, EstimateError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EstimateError::InvalidAdjustment(format!(
            "{} must be a non-negative number (got {})",
            field, value
        )));
    }
    Ok(value)
}

fn next_custom_id(items: &[EstimateLineItem]) -> String {
    let next = items
        .iter()
        .filter_map(|i| i.id.strip_prefix(CUSTOM_ID_PREFIX))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    format!("{}{:03}", CUSTOM_ID_PREFIX, next)
}

fn apply_adjustment(
    items: &mut Vec<EstimateLineItem>,
    adjustment: &LineItemAdjustment,
) -> Result<(), EstimateError> {
    match adjustment {
        LineItemAdjustment::UpdateItem {
            id,
            quantity,
            unit_price,
            description,
        } => {
            let item = items
                .iter_mut()
                .find(|i| &i.id == id)
                .ok_or_else(|| EstimateError::UnknownLineItem(id.clone()))?;

            if let Some(q) = quantity {
                item.quantity = check_amount("quantity", *q)?;
            }
            if let Some(p) = unit_price {
                item.unit_price = check_amount("unit_price", *p)?;
                item.price_comparison.variance =
                    percent_variance(item.unit_price, item.price_comparison.nrp_guideline);
            }
            if let Some(d) = description {
                if d.trim().is_empty() {
                    return Err(EstimateError::InvalidAdjustment(
                        "description cannot be empty".to_string(),
                    ));
                }
                item.description = d.trim().to_string();
            }
            item.total_price = round2(item.quantity * item.unit_price);
        }
        LineItemAdjustment::RemoveItem { id } => {
            let position = items
                .iter()
                .position(|i| &i.id == id)
                .ok_or_else(|| EstimateError::UnknownLineItem(id.clone()))?;
            items.remove(position);
        }
        LineItemAdjustment::AddCustomItem {
            category,
            description,
            quantity,
            unit,
            unit_price,
        } => {
            if description.trim().is_empty() {
                return Err(EstimateError::InvalidAdjustment(
                    "custom items need a description".to_string(),
                ));
            }
            let quantity = check_amount("quantity", *quantity)?;
            let unit_price = check_amount("unit_price", *unit_price)?;
            let unit = match unit.trim() {
                "" => "each",
                u => u,
            };

            let id = next_custom_id(items);
            items.push(EstimateLineItem {
                id,
                category: *category,
                item_code: "CUSTOM".to_string(),
                description: description.trim().to_string(),
                quantity,
                unit: unit.to_string(),
                unit_price,
                total_price: round2(quantity * unit_price),
                source: PriceSource::Custom,
                price_comparison: PriceReference::default(),
                notes: None,
                standard: None,
                warnings: Vec::new(),
            });
        }
    }

    Ok(())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn build_scope(assessment: &SiteAssessment) -> Scope {
    let damage = &assessment.damage_assessment;
    let drying = drying_days(assessment.rooms());

    let phases = vec![
        ScopePhase {
            phase: 1,
            name: "Emergency Response & Mitigation".to_string(),
            description: "Initial water extraction and stabilisation".to_string(),
            tasks: strings(&[
                "Site assessment and documentation",
                "Water extraction",
                "Initial antimicrobial application",
                "Equipment setup",
            ]),
            duration: 1,
            dependencies: vec![],
            milestones: strings(&["Water extraction complete", "Equipment operational"]),
        },
        ScopePhase {
            phase: 2,
            name: "Drying & Monitoring".to_string(),
            description: "Structural drying and daily monitoring".to_string(),
            tasks: strings(&[
                "Daily moisture readings",
                "Equipment adjustments",
                "Progress documentation",
            ]),
            duration: drying,
            dependencies: vec![1],
            milestones: strings(&["Moisture levels at target", "Drying complete"]),
        },
        ScopePhase {
            phase: 3,
            name: "Final Restoration".to_string(),
            description: "Equipment removal and final treatment".to_string(),
            tasks: strings(&[
                "Final moisture verification",
                "Equipment removal",
                "Final antimicrobial treatment",
                "Site cleanup",
            ]),
            duration: 1,
            dependencies: vec![2],
            milestones: strings(&["Restoration complete", "Sign-off obtained"]),
        },
    ];

    let mut start: u32 = 0;
    let timeline_phases = phases
        .iter()
        .map(|p| {
            let end = start.saturating_add(p.duration);
            let phase = TimelinePhase {
                phase: p.phase,
                start_day: start,
                end_day: end,
                description: p.name.clone(),
            };
            start = end;
            phase
        })
        .collect();

    Scope {
        summary: format!(
            "{} restoration services ({}, {})",
            damage.primary_cause.label(),
            damage.category,
            damage.class
        ),
        phases,
        exclusions: strings(&[
            "Reconstruction or repairs",
            "Contents cleaning",
            "Mould remediation (if discovered)",
            "Asbestos abatement",
        ]),
        assumptions: strings(&[
            "Uninterrupted access to property",
            "Power and water available on site",
            "No hazardous materials present",
        ]),
        timeline: Timeline {
            estimated_duration: start,
            phases: timeline_phases,
        },
        deliverables: strings(&[
            "Complete water extraction",
            "Dried structure to industry standards",
            "Moisture documentation",
            "Completion certificate",
        ]),
        quality_standards: strings(&[
            "IICRC S500 compliance",
            "Target moisture content < 16%",
            "Indoor air quality standards met",
        ]),
        safety_requirements: strings(&[
            "PPE for all technicians",
            "Electrical safety protocols",
            "Slip hazard management",
        ]),
    }
}

/// Fixed legal notice attached to every estimate
pub const DISCLAIMER_TEXT: &str = "This is an ESTIMATE only and not a fixed price quote.";

fn build_metadata(assessment: &SiteAssessment) -> EstimateMetadata {
    let damage = &assessment.damage_assessment;

    let section = |title: &str, content: &str, emphasis: Emphasis| DisclaimerSection {
        title: title.to_string(),
        content: content.to_string(),
        emphasis,
        required: true,
    };

    EstimateMetadata {
        created_by: "System".to_string(),
        last_modified_by: "System".to_string(),
        tags: vec![
            damage.primary_cause.to_string(),
            format!("category_{}", damage.category.number()),
            assessment.property_details.property_type.to_string(),
        ],
        compliance: ComplianceFlags {
            australian_consumer_law: true,
            fair_trading: true,
            building_codes: strings(&["NCC 2022"]),
            insurance_requirements: strings(&["Public Liability", "Professional Indemnity"]),
            environmental_standards: strings(&["AS/NZS 4858"]),
        },
        disclaimer: Disclaimer {
            text: DISCLAIMER_TEXT.to_string(),
            sections: vec![
                section(
                    "Important Notice",
                    "This is an ESTIMATE only and not a fixed price quote. Actual costs may vary depending on site findings and unforeseen requirements. Client approval is required to commence works.",
                    Emphasis::Highlighted,
                ),
                section(
                    "Variation Clause",
                    "Additional work discovered during restoration will be documented and approved before proceeding. Variations may affect the final cost.",
                    Emphasis::Standard,
                ),
                section(
                    "Consumer Rights",
                    "This estimate is provided in accordance with Australian Consumer Law. You have the right to obtain quotes from other providers.",
                    Emphasis::Standard,
                ),
            ],
            legal_review: true,
        },
    }
}

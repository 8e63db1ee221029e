//! Static unit-cost lookup for estimate generation.
//!
//! Rates are NRP guideline prices in AUD, excluding GST.

use crate::domain::{PriceReference, WaterCategory};

/// Fixed contingency policy applied to the subtotal
pub const CONTINGENCY_RATE: f64 = 0.10;

/// Australian GST applied to the taxable amount
pub const GST_RATE: f64 = 0.10;

/// A priced item with its reference prices
#[derive(Debug, Clone, Copy)]
pub struct Rate {
    pub unit_price: f64,
    pub nrp_guideline: f64,
    pub contractor_rate: f64,
    pub industry_average: f64,
}

impl Rate {
    fn new(unit_price: f64, nrp_guideline: f64, contractor_rate: f64, industry_average: f64) -> Self {
        Self {
            unit_price,
            nrp_guideline,
            contractor_rate,
            industry_average,
        }
    }

    pub fn reference(&self) -> PriceReference {
        PriceReference {
            nrp_guideline: self.nrp_guideline,
            contractor_rate: self.contractor_rate,
            industry_average: self.industry_average,
            variance: percent_variance(self.unit_price, self.nrp_guideline),
        }
    }
}

/// Equipment rate lookup result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquipmentRate {
    pub daily_rate: f64,
    /// `true` when the type was not in the table
    pub is_default: bool,
}

impl EquipmentRate {
    /// Contractor and industry references are derived from the guideline rate
    pub fn reference(&self) -> PriceReference {
        PriceReference {
            nrp_guideline: self.daily_rate,
            contractor_rate: round2(self.daily_rate * 1.05),
            industry_average: round2(self.daily_rate * 1.02),
            variance: Some(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricingTable {
    pub emergency_callout: Rate,
    pub lead_technician_hourly: Rate,
    pub assistant_hourly: Rate,
    pub antimicrobial_application: Rate,
    pub waste_removal_cubic_metre: Rate,
    /// Affected m² treated per antimicrobial application
    pub area_per_application: f64,
    /// Affected m² producing one m³ of waste
    pub area_per_waste_unit: f64,
    equipment: Vec<(&'static str, f64)>,
    default_equipment_rate: f64,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PricingTable {
    pub fn standard() -> Self {
        Self {
            emergency_callout: Rate::new(550.0, 550.0, 550.0, 575.0),
            lead_technician_hourly: Rate::new(85.0, 80.0, 85.0, 82.0),
            assistant_hourly: Rate::new(55.0, 57.5, 55.0, 58.0),
            antimicrobial_application: Rate::new(45.0, 45.0, 48.0, 46.0),
            waste_removal_cubic_metre: Rate::new(250.0, 250.0, 275.0, 260.0),
            area_per_application: 10.0,
            area_per_waste_unit: 20.0,
            equipment: vec![
                ("Air Mover", 45.0),
                ("Dehumidifier", 105.0),
                ("HEPA Air Scrubber", 85.0),
                ("Thermal Imaging", 150.0),
                ("Moisture Meter", 25.0),
            ],
            default_equipment_rate: 50.0,
        }
    }

    /// Labour hours per affected m², by water category
    pub fn labour_factor(&self, category: WaterCategory) -> f64 {
        match category {
            WaterCategory::Clean => 0.4,
            WaterCategory::Grey => 0.5,
            WaterCategory::Black => 0.75,
        }
    }

    /// Daily hire rate for an equipment type. Matching ignores case and
    /// surrounding whitespace; unknown types get the default rate.
    pub fn equipment_rate(&self, equipment_type: &str) -> EquipmentRate {
        let wanted = equipment_type.trim();
        self.equipment
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|&(_, daily_rate)| EquipmentRate {
                daily_rate,
                is_default: false,
            })
            .unwrap_or(EquipmentRate {
                daily_rate: self.default_equipment_rate,
                is_default: true,
            })
    }
}

/// `(selected - guideline) / guideline * 100`, rounded to two decimals.
/// `None` when the guideline is zero.
pub fn percent_variance(selected: f64, guideline: f64) -> Option<f64> {
    if guideline == 0.0 || !guideline.is_finite() || !selected.is_finite() {
        return None;
    }
    Some(round2((selected - guideline) / guideline * 100.0))
}

/// Round to cents. Adding 0.0 turns -0.0 into 0.0.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0 + 0.0
}

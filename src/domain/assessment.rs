//! Site assessment domain types
//!
//! Captured by the inspection workflow and consumed read-only by the
//! estimate generator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IICRC water category (contamination level)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum WaterCategory {
    Clean,
    Grey,
    Black,
}

impl WaterCategory {
    pub fn number(self) -> u8 {
        match self {
            Self::Clean => 1,
            Self::Grey => 2,
            Self::Black => 3,
        }
    }
}

impl TryFrom<u8> for WaterCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Clean),
            2 => Ok(Self::Grey),
            3 => Ok(Self::Black),
            other => Err(format!(
                "water damage category must be 1, 2 or 3 (got {})",
                other
            )),
        }
    }
}

impl From<WaterCategory> for u8 {
    fn from(c: WaterCategory) -> Self {
        c.number()
    }
}

impl fmt::Display for WaterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category {}", self.number())
    }
}

/// IICRC water class (extent of wetting / evaporation load)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum WaterClass {
    One,
    Two,
    Three,
    Four,
}

impl WaterClass {
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
        }
    }
}

impl TryFrom<u8> for WaterClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            other => Err(format!(
                "water damage class must be between 1 and 4 (got {})",
                other
            )),
        }
    }
}

impl From<WaterClass> for u8 {
    fn from(c: WaterClass) -> Self {
        c.number()
    }
}

impl fmt::Display for WaterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class {}", self.number())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
    Industrial,
    Strata,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyType::Residential => write!(f, "residential"),
            PropertyType::Commercial => write!(f, "commercial"),
            PropertyType::Industrial => write!(f, "industrial"),
            PropertyType::Strata => write!(f, "strata"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DamageCause {
    WaterDamage,
    FireDamage,
    StormDamage,
    MouldRemediation,
    SewageBackflow,
}

impl fmt::Display for DamageCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageCause::WaterDamage => write!(f, "water_damage"),
            DamageCause::FireDamage => write!(f, "fire_damage"),
            DamageCause::StormDamage => write!(f, "storm_damage"),
            DamageCause::MouldRemediation => write!(f, "mould_remediation"),
            DamageCause::SewageBackflow => write!(f, "sewage_backflow"),
        }
    }
}

impl DamageCause {
    /// Human readable label used in scope summaries
    pub fn label(&self) -> &'static str {
        match self {
            DamageCause::WaterDamage => "Water damage",
            DamageCause::FireDamage => "Fire damage",
            DamageCause::StormDamage => "Storm damage",
            DamageCause::MouldRemediation => "Mould remediation",
            DamageCause::SewageBackflow => "Sewage backflow",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HazardLevel {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DamageLevel {
    Minor,
    #[default]
    Moderate,
    Significant,
    Severe,
    TotalLoss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

/// Drying equipment assigned to a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub quantity: f64,
    /// Hire duration in days
    pub duration: f64,
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub dimensions: Dimensions,
    /// Floor area in m²
    pub area: f64,
    /// Share of the floor area affected, 0-100
    pub affected_percentage: f64,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub damage_level: DamageLevel,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
}

impl Room {
    pub fn affected_area(&self) -> f64 {
        self.area * self.affected_percentage / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub address: String,
    #[serde(default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub year_built: Option<u16>,
    #[serde(default)]
    pub construction_type: Option<String>,
    #[serde(default)]
    pub total_area: Option<f64>,
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageAssessment {
    pub primary_cause: DamageCause,
    pub category: WaterCategory,
    pub class: WaterClass,
    #[serde(default)]
    pub hazard_level: HazardLevel,
    #[serde(default)]
    pub contaminants: Vec<String>,
    #[serde(default)]
    pub special_requirements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    #[serde(rename = "type")]
    pub reading_type: String,
    pub location: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
}

/// Site assessment produced by the inspection workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteAssessment {
    pub id: String,
    #[serde(default)]
    pub assessment_date: Option<String>,
    #[serde(default)]
    pub technician: Option<Technician>,
    pub property_details: PropertyDetails,
    pub damage_assessment: DamageAssessment,
    #[serde(default)]
    pub environmental_readings: Vec<EnvironmentalReading>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SiteAssessment {
    pub fn rooms(&self) -> &[Room] {
        &self.property_details.rooms
    }

    /// Σ room.area × room.affected_percentage / 100
    pub fn total_affected_area(&self) -> f64 {
        self.rooms().iter().map(Room::affected_area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_rejects_out_of_range_values() {
        assert_eq!(WaterCategory::try_from(2), Ok(WaterCategory::Grey));
        let err = WaterCategory::try_from(4).unwrap_err();
        assert!(err.contains("got 4"));
    }

    #[test]
    fn class_deserializes_from_number() {
        let class: WaterClass = serde_json::from_str("3").unwrap();
        assert_eq!(class, WaterClass::Three);
        assert!(serde_json::from_str::<WaterClass>("0").is_err());
        assert_eq!(serde_json::to_string(&WaterClass::Four).unwrap(), "4");
    }

    #[test]
    fn affected_area_uses_percentage() {
        let room = Room {
            id: "R1".into(),
            name: "Kitchen".into(),
            room_type: None,
            dimensions: Dimensions::default(),
            area: 20.0,
            affected_percentage: 25.0,
            materials: vec![],
            damage_level: DamageLevel::Minor,
            equipment: vec![],
        };
        assert_eq!(room.affected_area(), 5.0);
    }

    #[test]
    fn omitted_levels_take_their_defaults() {
        let room: Room = serde_json::from_str(
            r#"{ "id": "R1", "name": "Hall", "area": 6.0, "affected_percentage": 50.0 }"#,
        )
        .unwrap();
        assert_eq!(room.damage_level, DamageLevel::Moderate);

        let details: PropertyDetails =
            serde_json::from_str(r#"{ "address": "1 King St", "rooms": [] }"#).unwrap();
        assert_eq!(details.property_type, PropertyType::Residential);
        assert_eq!(HazardLevel::default(), HazardLevel::Low);
        assert_eq!(crate::domain::EstimateStatus::default(), crate::domain::EstimateStatus::Draft);
    }
}

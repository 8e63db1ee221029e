//! Domain types and DTOs
//!
//! Site assessments and the estimates generated from them, training
//! progress, and marketing campaigns.

#![allow(dead_code)]

pub mod assessment;
pub mod campaigns;
pub mod estimate;
pub mod progress;

// Re-export commonly used types
pub use assessment::*;
pub use estimate::*;

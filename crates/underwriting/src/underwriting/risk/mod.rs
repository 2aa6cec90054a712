//! Risk factor extraction and the two coexisting scoring policies.
//!
//! The additive model (0-1, higher is riskier) is canonical and feeds the decision engine. The
//! legacy severity model (0-100, higher is safer) is kept as a separate scorer so stored scores
//! stay comparable; [`RiskScore`] converts between the two scales.

mod factors;
mod scoring;
mod weights;

pub use factors::{extract_risk_factors, legacy_risk_factors};
pub use scoring::{
    additive_breakdown, additive_risk_score, legacy_recommendation, legacy_risk_level,
    legacy_severity_score, risk_level, AdditiveRiskScorer, LegacySeverityScorer,
};

use serde::{Deserialize, Serialize};

use super::domain::Assessment;

/// Capability shared by every scoring policy.
pub trait RiskScorer: Send + Sync {
    fn model(&self) -> ScoringModel;
    fn score(&self, assessment: &Assessment) -> RiskScore;
}

/// Selects which scorer an integrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModel {
    Additive,
    LegacySeverity,
}

impl ScoringModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "additive" | "unit" => Some(Self::Additive),
            "legacy_severity" | "legacy" | "severity" => Some(Self::LegacySeverity),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Additive => "additive",
            Self::LegacySeverity => "legacy_severity",
        }
    }

    pub fn scorer(self, reference_year: i32) -> Box<dyn RiskScorer> {
        match self {
            Self::Additive => Box::new(AdditiveRiskScorer::new(reference_year)),
            Self::LegacySeverity => Box::new(LegacySeverityScorer::new(reference_year)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskScale {
    /// 0.0 to 1.0, higher is riskier.
    UnitRisk,
    /// 0 to 100, higher is safer.
    LegacySafety,
}

/// A score tagged with the scale it was produced on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub value: f64,
    pub scale: RiskScale,
}

impl RiskScore {
    pub fn unit(value: f64) -> Self {
        Self {
            value,
            scale: RiskScale::UnitRisk,
        }
    }

    pub fn legacy(value: f64) -> Self {
        Self {
            value,
            scale: RiskScale::LegacySafety,
        }
    }

    pub fn to_unit_risk(self) -> Self {
        match self.scale {
            RiskScale::UnitRisk => self,
            RiskScale::LegacySafety => Self::unit((1.0 - self.value / 100.0).clamp(0.0, 1.0)),
        }
    }

    pub fn to_legacy_safety(self) -> Self {
        match self.scale {
            RiskScale::LegacySafety => self,
            RiskScale::UnitRisk => Self::legacy(((1.0 - self.value) * 100.0).clamp(0.0, 100.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    DriverAge,
    DrivingExperience,
    AccidentHistory,
    VehicleAge,
    CoverageType,
}

/// Weight contributed by one category, so decisions can be audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub category: RiskCategory,
    pub band: String,
    pub weight: f64,
}

use super::super::domain::{Assessment, RiskFactor, RiskSeverity};
use super::factors::legacy_risk_factors;
use super::weights::{self, Band};
use super::{RiskCategory, RiskScore, RiskScorer, ScoreComponent, ScoringModel};

fn selected_bands(assessment: &Assessment, reference_year: i32) -> [(RiskCategory, Band); 5] {
    [
        (
            RiskCategory::DriverAge,
            weights::driver_age(assessment.driver.age),
        ),
        (
            RiskCategory::DrivingExperience,
            weights::driving_experience(assessment.driver.experience_years),
        ),
        (
            RiskCategory::AccidentHistory,
            weights::accident_history(assessment.driver.previous_accidents),
        ),
        (
            RiskCategory::VehicleAge,
            weights::vehicle_age(assessment.vehicle_age(reference_year)),
        ),
        (
            RiskCategory::CoverageType,
            weights::coverage_type(assessment.coverage.coverage_type),
        ),
    ]
}

/// One weight per category, in a stable category order.
pub fn additive_breakdown(assessment: &Assessment, reference_year: i32) -> Vec<ScoreComponent> {
    selected_bands(assessment, reference_year)
        .into_iter()
        .map(|(category, band)| ScoreComponent {
            category,
            band: band.label.to_string(),
            weight: band.weight(),
        })
        .collect()
}

/// Sum of the selected band weights, capped at 1.0. Higher is riskier.
pub fn additive_risk_score(assessment: &Assessment, reference_year: i32) -> f64 {
    let hundredths: u32 = selected_bands(assessment, reference_year)
        .iter()
        .map(|(_, band)| band.hundredths)
        .sum();
    f64::from(hundredths.min(100)) / 100.0
}

const fn legacy_weight(severity: RiskSeverity) -> u32 {
    match severity {
        RiskSeverity::Low => 1,
        RiskSeverity::Medium => 2,
        RiskSeverity::High => 3,
    }
}

/// Legacy 0-100 scale where 100 is safest: `100 - 10 × Σ severity weights`, clamped.
pub fn legacy_severity_score(factors: &[RiskFactor]) -> f64 {
    let total: u32 = factors
        .iter()
        .map(|factor| legacy_weight(factor.severity))
        .sum();
    (100.0 - f64::from(total) * 10.0).clamp(0.0, 100.0)
}

/// Banding for the legacy safety scale.
pub fn legacy_risk_level(score: f64) -> RiskSeverity {
    if score >= 70.0 {
        RiskSeverity::Low
    } else if score >= 40.0 {
        RiskSeverity::Medium
    } else {
        RiskSeverity::High
    }
}

pub fn legacy_recommendation(score: f64) -> &'static str {
    match legacy_risk_level(score) {
        RiskSeverity::Low => "Recommended for approval. Standard terms and conditions apply.",
        RiskSeverity::Medium => {
            "Recommended for approval with additional conditions: higher premium and/or deductible may apply."
        }
        RiskSeverity::High => {
            "Not recommended for approval. Risk factors exceed acceptable threshold."
        }
    }
}

/// Banding for the canonical 0-1 scale used in reports.
pub fn risk_level(unit_score: f64) -> RiskSeverity {
    if unit_score < 0.3 {
        RiskSeverity::Low
    } else if unit_score < 0.7 {
        RiskSeverity::Medium
    } else {
        RiskSeverity::High
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdditiveRiskScorer {
    reference_year: i32,
}

impl AdditiveRiskScorer {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }
}

impl RiskScorer for AdditiveRiskScorer {
    fn model(&self) -> ScoringModel {
        ScoringModel::Additive
    }

    fn score(&self, assessment: &Assessment) -> RiskScore {
        RiskScore::unit(additive_risk_score(assessment, self.reference_year))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LegacySeverityScorer {
    reference_year: i32,
}

impl LegacySeverityScorer {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }
}

impl RiskScorer for LegacySeverityScorer {
    fn model(&self) -> ScoringModel {
        ScoringModel::LegacySeverity
    }

    fn score(&self, assessment: &Assessment) -> RiskScore {
        let factors = legacy_risk_factors(assessment, self.reference_year);
        RiskScore::legacy(legacy_severity_score(&factors))
    }
}

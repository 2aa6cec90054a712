use super::super::domain::{format_amount, Assessment, CoverageType, RiskFactor, RiskSeverity};

const YOUNG_DRIVER_AGE: u8 = 25;
const MIN_EXPERIENCE_YEARS: u8 = 2;
const OLD_VEHICLE_YEARS: i32 = 10;
const LOW_DEDUCTIBLE: f64 = 1_000.0;

fn factor(id: &str, name: &str, severity: RiskSeverity, description: String) -> RiskFactor {
    RiskFactor {
        id: id.to_string(),
        name: name.to_string(),
        severity,
        description,
    }
}

/// Extract the risk factors driving an assessment.
///
/// Rules fire independently and append in a fixed order: driver, then vehicle, then coverage.
pub fn extract_risk_factors(assessment: &Assessment, reference_year: i32) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let driver = &assessment.driver;

    if driver.age < YOUNG_DRIVER_AGE {
        factors.push(factor(
            "young-driver",
            "Young Driver",
            RiskSeverity::High,
            "Driver age under 25 represents higher statistical risk.".to_string(),
        ));
    }

    if driver.experience_years < MIN_EXPERIENCE_YEARS {
        factors.push(factor(
            "inexperienced",
            "Limited Driving Experience",
            RiskSeverity::High,
            "Less than 2 years of driving experience indicates higher risk.".to_string(),
        ));
    }

    if driver.previous_accidents > 0 {
        let severity = if driver.previous_accidents > 2 {
            RiskSeverity::High
        } else {
            RiskSeverity::Medium
        };
        factors.push(factor(
            "accident-history",
            "Previous Accidents",
            severity,
            format!(
                "Driver has {} previous accident(s).",
                driver.previous_accidents
            ),
        ));
    }

    if assessment.vehicle_age(reference_year) > OLD_VEHICLE_YEARS {
        factors.push(factor(
            "old-vehicle",
            "Older Vehicle",
            RiskSeverity::Medium,
            "Vehicle is over 10 years old, which may indicate higher maintenance needs."
                .to_string(),
        ));
    }

    let limits = assessment.coverage.coverage_type.limits();
    if assessment.coverage.amount < limits.minimum {
        factors.push(factor(
            "low-coverage",
            "Below Minimum Coverage",
            RiskSeverity::High,
            format!(
                "Coverage amount is below the minimum requirement of {} AED.",
                format_amount(limits.minimum)
            ),
        ));
    } else if assessment.coverage.amount < limits.recommended {
        factors.push(factor(
            "below-recommended-coverage",
            "Below Recommended Coverage",
            RiskSeverity::Medium,
            format!(
                "Coverage amount is below the recommended level of {} AED.",
                format_amount(limits.recommended)
            ),
        ));
    }

    factors
}

/// Factor set consumed by the legacy 0-100 severity scorer.
///
/// Differs from [`extract_risk_factors`]: inexperience is medium, and coverage is judged by product
/// and deductible rather than by amount.
pub fn legacy_risk_factors(assessment: &Assessment, reference_year: i32) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let driver = &assessment.driver;

    if driver.age < YOUNG_DRIVER_AGE {
        factors.push(factor(
            "young-driver",
            "Young Driver",
            RiskSeverity::High,
            "Driver is under 25 years old, which statistically indicates higher risk.".to_string(),
        ));
    }

    if driver.experience_years < MIN_EXPERIENCE_YEARS {
        factors.push(factor(
            "inexperienced-driver",
            "Inexperienced Driver",
            RiskSeverity::Medium,
            "Driver has less than 2 years of driving experience.".to_string(),
        ));
    }

    if driver.previous_accidents > 0 {
        let severity = if driver.previous_accidents > 2 {
            RiskSeverity::High
        } else {
            RiskSeverity::Medium
        };
        factors.push(factor(
            "accident-history",
            "Accident History",
            severity,
            format!(
                "Driver has {} previous accident(s).",
                driver.previous_accidents
            ),
        ));
    }

    if assessment.vehicle_age(reference_year) > OLD_VEHICLE_YEARS {
        factors.push(factor(
            "old-vehicle",
            "Older Vehicle",
            RiskSeverity::Medium,
            "Vehicle is over 10 years old, which may indicate higher maintenance needs."
                .to_string(),
        ));
    }

    if assessment.coverage.coverage_type == CoverageType::Liability {
        factors.push(factor(
            "basic-coverage",
            "Basic Coverage Only",
            RiskSeverity::Low,
            "Only liability coverage selected, which provides minimal protection.".to_string(),
        ));
    }

    if assessment.coverage.deductible < LOW_DEDUCTIBLE {
        factors.push(factor(
            "low-deductible",
            "Low Deductible",
            RiskSeverity::Low,
            "Low deductible may indicate higher claim frequency.".to_string(),
        ));
    }

    factors
}

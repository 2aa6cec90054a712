use super::domain::{format_amount, Assessment};

/// Optional covers most often left off motor policies.
pub const COMMON_ADDITIONAL_COVERAGES: [&str; 3] = [
    "Personal Accident Cover",
    "Roadside Assistance",
    "Natural Disaster Coverage",
];

/// Advisory actions for the underwriter's report. Never consulted by the decision engine.
pub fn generate_recommendations(assessment: &Assessment, reference_year: i32) -> Vec<String> {
    let mut recommendations = Vec::new();
    let driver = &assessment.driver;
    let coverage = &assessment.coverage;
    let limits = coverage.coverage_type.limits();

    if coverage.amount < limits.recommended {
        recommendations.push(format!(
            "Consider increasing coverage to recommended level of {} AED",
            format_amount(limits.recommended)
        ));
    }

    if driver.age < 25 {
        recommendations.push("Complete defensive driving course".to_string());
        recommendations.push("Install telematics device for monitoring".to_string());
    }

    if driver.experience_years < 2 {
        recommendations.push("Additional driver training required".to_string());
        recommendations.push("Consider higher deductibles".to_string());
    }

    if driver.previous_accidents > 0 {
        recommendations.push("Submit detailed accident history reports".to_string());
        recommendations.push("Provide evidence of corrective measures taken".to_string());
    }

    if assessment.vehicle_age(reference_year) > 10 {
        recommendations.push("Complete comprehensive vehicle inspection".to_string());
        recommendations.push("Provide maintenance history documentation".to_string());
    }

    let missing: Vec<&str> = COMMON_ADDITIONAL_COVERAGES
        .iter()
        .copied()
        .filter(|name| {
            !coverage
                .additional_coverages
                .iter()
                .any(|selected| selected == name)
        })
        .collect();
    if !missing.is_empty() {
        recommendations.push(format!(
            "Consider adding additional coverage: {}",
            missing.join(", ")
        ));
    }

    recommendations
}

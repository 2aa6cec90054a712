use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Assessment, AssessmentId, AssessmentStatus, CoverageSelection, DocumentReference,
    DriverProfile,
};
use super::risk::extract_risk_factors;

const MINIMUM_COVERAGE_AMOUNT: f64 = 1_000.0;

/// Inbound payload for a new assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSubmission {
    pub vehicle_model: String,
    pub vehicle_year: i32,
    pub driver: DriverProfile,
    pub coverage: CoverageSelection,
    #[serde(default)]
    pub documents: Vec<DocumentReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field that failed, in form order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid submission: {}", render(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

fn render(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

/// Validates submissions and stamps accepted ones with ids and tracking numbers.
#[derive(Debug)]
pub struct AssessmentIntake {
    sequence: AtomicU64,
}

impl Default for AssessmentIntake {
    fn default() -> Self {
        Self {
            sequence: AtomicU64::new(1),
        }
    }
}

impl AssessmentIntake {
    pub fn validate(
        &self,
        submission: &AssessmentSubmission,
        reference_year: i32,
    ) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &'static str, message: &'static str| {
            if !ok {
                errors.push(FieldError { field, message });
            }
        };

        check(
            submission.vehicle_model.trim().chars().count() >= 2,
            "vehicle_model",
            "Vehicle model must be at least 2 characters",
        );
        check(
            submission.vehicle_year >= 1900,
            "vehicle_year",
            "Invalid year",
        );
        check(
            submission.vehicle_year <= reference_year + 1,
            "vehicle_year",
            "Year cannot be in the future",
        );

        let driver = &submission.driver;
        check(
            driver.name.trim().chars().count() >= 3,
            "driver.name",
            "Name must be at least 3 characters",
        );
        check(
            driver.license_number.trim().chars().count() >= 5,
            "driver.license_number",
            "License number must be at least 5 characters",
        );
        check(
            driver.age >= 18,
            "driver.age",
            "Driver must be at least 18 years old",
        );
        check(driver.age <= 100, "driver.age", "Invalid age");

        let coverage = &submission.coverage;
        check(
            coverage.amount.is_finite() && coverage.amount >= MINIMUM_COVERAGE_AMOUNT,
            "coverage.amount",
            "Coverage amount must be at least 1,000 AED",
        );
        check(
            coverage.deductible.is_finite() && coverage.deductible >= 0.0,
            "coverage.deductible",
            "Deductible cannot be negative",
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Validate and convert into a pending assessment with computed risk factors.
    pub fn assessment_from_submission(
        &self,
        submission: AssessmentSubmission,
        reference_year: i32,
        now: DateTime<Utc>,
    ) -> Result<Assessment, ValidationErrors> {
        self.validate(&submission, reference_year)?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut assessment = Assessment {
            id: AssessmentId(format!("asm-{sequence:06}")),
            status: AssessmentStatus::Pending,
            vehicle_model: submission.vehicle_model.trim().to_string(),
            vehicle_year: submission.vehicle_year,
            driver: submission.driver,
            coverage: submission.coverage,
            documents: submission.documents,
            comments: Vec::new(),
            risk_factors: Vec::new(),
            created_at: now,
            updated_at: now,
            tracking_number: format!("RA-{}-{:04}", now.year(), sequence % 10_000),
        };
        assessment.risk_factors = extract_risk_factors(&assessment, reference_year);

        Ok(assessment)
    }
}

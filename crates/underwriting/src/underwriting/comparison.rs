use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{Assessment, DocumentReference};
use super::risk::additive_risk_score;

const SIGNIFICANT_AMOUNT_DELTA: f64 = 50_000.0;
const SIGNIFICANT_YEARS_DELTA: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    VehicleModel,
    VehicleYear,
    DriverName,
    DriverLicenseNumber,
    DriverAge,
    DriverExperience,
    PreviousAccidents,
    CoverageType,
    CoverageAmount,
    RemovedDocuments,
    AddedDocuments,
}

impl ChangedField {
    pub const fn label(self) -> &'static str {
        match self {
            ChangedField::VehicleModel => "Vehicle Model",
            ChangedField::VehicleYear => "Vehicle Year",
            ChangedField::DriverName => "Driver Name",
            ChangedField::DriverLicenseNumber => "Driver License Number",
            ChangedField::DriverAge => "Driver Age",
            ChangedField::DriverExperience => "Driver Experience",
            ChangedField::PreviousAccidents => "Previous Accidents",
            ChangedField::CoverageType => "Coverage Type",
            ChangedField::CoverageAmount => "Coverage Amount",
            ChangedField::RemovedDocuments => "Removed Documents",
            ChangedField::AddedDocuments => "Added Documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: ChangedField,
    pub old_value: Value,
    pub new_value: Value,
    pub significant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskImpact {
    Increased,
    Decreased,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentComparison {
    pub changes: Vec<FieldChange>,
    pub risk_impact: RiskImpact,
    pub significant_changes: bool,
}

/// Diff two snapshots of the same assessment and judge the effect on risk.
pub fn compare_assessments(
    old: &Assessment,
    new: &Assessment,
    reference_year: i32,
) -> AssessmentComparison {
    let mut changes = Vec::new();
    let mut push = |field: ChangedField, old_value: Value, new_value: Value, significant: bool| {
        changes.push(FieldChange {
            field,
            old_value,
            new_value,
            significant,
        });
    };

    if old.vehicle_model != new.vehicle_model {
        push(
            ChangedField::VehicleModel,
            json!(old.vehicle_model),
            json!(new.vehicle_model),
            false,
        );
    }
    if old.vehicle_year != new.vehicle_year {
        push(
            ChangedField::VehicleYear,
            json!(old.vehicle_year),
            json!(new.vehicle_year),
            false,
        );
    }

    let (before, after) = (&old.driver, &new.driver);
    if before.name != after.name {
        push(
            ChangedField::DriverName,
            json!(before.name),
            json!(after.name),
            false,
        );
    }
    if before.license_number != after.license_number {
        push(
            ChangedField::DriverLicenseNumber,
            json!(before.license_number),
            json!(after.license_number),
            false,
        );
    }
    if before.age != after.age {
        push(
            ChangedField::DriverAge,
            json!(before.age),
            json!(after.age),
            years_delta(before.age, after.age) > SIGNIFICANT_YEARS_DELTA,
        );
    }
    if before.experience_years != after.experience_years {
        push(
            ChangedField::DriverExperience,
            json!(before.experience_years),
            json!(after.experience_years),
            years_delta(before.experience_years, after.experience_years)
                > SIGNIFICANT_YEARS_DELTA,
        );
    }
    if before.previous_accidents != after.previous_accidents {
        push(
            ChangedField::PreviousAccidents,
            json!(before.previous_accidents),
            json!(after.previous_accidents),
            true,
        );
    }

    if old.coverage.coverage_type != new.coverage.coverage_type {
        push(
            ChangedField::CoverageType,
            json!(old.coverage.coverage_type),
            json!(new.coverage.coverage_type),
            true,
        );
    }
    if old.coverage.amount != new.coverage.amount {
        push(
            ChangedField::CoverageAmount,
            json!(old.coverage.amount),
            json!(new.coverage.amount),
            (old.coverage.amount - new.coverage.amount).abs() > SIGNIFICANT_AMOUNT_DELTA,
        );
    }

    let removed = missing_from(&old.documents, &new.documents);
    if !removed.is_empty() {
        push(
            ChangedField::RemovedDocuments,
            json!(removed),
            Value::Null,
            false,
        );
    }
    let added = missing_from(&new.documents, &old.documents);
    if !added.is_empty() {
        push(ChangedField::AddedDocuments, Value::Null, json!(added), false);
    }

    let old_score = additive_risk_score(old, reference_year);
    let new_score = additive_risk_score(new, reference_year);
    let risk_impact = if new_score > old_score {
        RiskImpact::Increased
    } else if new_score < old_score {
        RiskImpact::Decreased
    } else {
        RiskImpact::Unchanged
    };

    let significant_changes = changes.iter().any(|change| change.significant);
    AssessmentComparison {
        changes,
        risk_impact,
        significant_changes,
    }
}

fn years_delta(before: u8, after: u8) -> i64 {
    (i64::from(before) - i64::from(after)).abs()
}

fn missing_from<'a>(
    source: &'a [DocumentReference],
    other: &[DocumentReference],
) -> Vec<&'a DocumentReference> {
    source
        .iter()
        .filter(|document| !other.contains(document))
        .collect()
}

mod regulations;

pub use regulations::{
    diff_regulations, Regulation, RegulationCategory, RegulationChange, RegulationDiff,
    RegulationError, RegulationSource, StaticRegulations,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{format_amount, Assessment, DocumentCategory};

/// Statutory floor on coverage, regardless of product.
pub const JURISDICTION_MINIMUM_COVERAGE: f64 = 250_000.0;
pub const MINIMUM_DRIVER_AGE: u8 = 18;
pub const MAXIMUM_VEHICLE_AGE: i32 = 15;

const REQUIRED_DOCUMENTS: [DocumentCategory; 3] = [
    DocumentCategory::DriverLicense,
    DocumentCategory::VehicleRegistration,
    DocumentCategory::InsurancePolicy,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub is_compliant: bool,
    pub violations: Vec<String>,
    pub requirements: Vec<String>,
}

/// How required documents are recognised on an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCheckMode {
    /// Match on the typed document category.
    Category,
    /// Case-insensitive substring match of the category key against document names.
    NameSubstring,
}

impl DocumentCheckMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "category" => Some(Self::Category),
            "name_substring" | "name" => Some(Self::NameSubstring),
            _ => None,
        }
    }
}

/// Rule-based regulatory check over an assessment snapshot.
#[derive(Debug, Clone)]
pub struct ComplianceChecker {
    regulations: Vec<Regulation>,
    document_check: DocumentCheckMode,
}

impl Default for ComplianceChecker {
    fn default() -> Self {
        Self::new(DocumentCheckMode::Category)
    }
}

impl ComplianceChecker {
    pub fn new(document_check: DocumentCheckMode) -> Self {
        Self {
            regulations: StaticRegulations::motor_baseline(),
            document_check,
        }
    }

    pub fn regulations(&self) -> &[Regulation] {
        &self.regulations
    }

    pub fn document_check(&self) -> DocumentCheckMode {
        self.document_check
    }

    /// Requirements contributed by every regulation in table order.
    pub fn requirements(&self) -> Vec<String> {
        self.regulations
            .iter()
            .flat_map(|regulation| regulation.requirements.iter().cloned())
            .collect()
    }

    pub fn check(&self, assessment: &Assessment, reference_year: i32) -> ComplianceResult {
        let mut violations = Vec::new();

        if assessment.coverage.amount < JURISDICTION_MINIMUM_COVERAGE {
            violations.push(format!(
                "Coverage amount ({} AED) is below minimum requirement of {} AED",
                format_amount(assessment.coverage.amount),
                format_amount(JURISDICTION_MINIMUM_COVERAGE)
            ));
        }

        if assessment.driver.age < MINIMUM_DRIVER_AGE {
            violations.push("Driver must be at least 18 years old".to_string());
        }

        if assessment.vehicle_age(reference_year) > MAXIMUM_VEHICLE_AGE {
            violations.push("Vehicle exceeds maximum age limit of 15 years".to_string());
        }

        let missing: Vec<&str> = REQUIRED_DOCUMENTS
            .iter()
            .filter(|category| !self.has_document(assessment, **category))
            .map(|category| category.key())
            .collect();
        if !missing.is_empty() {
            violations.push(format!(
                "Missing required documents: {}",
                missing.join(", ")
            ));
        }

        ComplianceResult {
            is_compliant: violations.is_empty(),
            violations,
            requirements: self.requirements(),
        }
    }

    fn has_document(&self, assessment: &Assessment, category: DocumentCategory) -> bool {
        match self.document_check {
            DocumentCheckMode::Category => assessment.has_document(category),
            DocumentCheckMode::NameSubstring => assessment
                .documents
                .iter()
                .any(|document| document.name.to_lowercase().contains(category.key())),
        }
    }

    /// Markdown report for attaching to the assessment file.
    pub fn report(&self, assessment: &Assessment, reference_year: i32) -> String {
        let result = self.check(assessment, reference_year);
        let mut report = String::from("# Compliance Assessment Report\n\n");

        let status = if result.is_compliant {
            "Compliant"
        } else {
            "Non-Compliant"
        };
        report.push_str(&format!("## Status: {status}\n\n"));

        if !result.violations.is_empty() {
            report.push_str("## Violations:\n");
            for violation in &result.violations {
                report.push_str(&format!("- {violation}\n"));
            }
            report.push('\n');
        }

        report.push_str("## Requirements:\n");
        for requirement in &result.requirements {
            report.push_str(&format!("- {requirement}\n"));
        }

        report
    }

    /// Pull the current table from `source`. On failure the last-known table stays in force.
    pub fn refresh_regulations(&mut self, source: &dyn RegulationSource) -> Option<RegulationDiff> {
        match source.fetch() {
            Ok(remote) => {
                let diff = diff_regulations(&self.regulations, &remote);
                info!(
                    added = diff.added.len(),
                    modified = diff.modified.len(),
                    removed = diff.removed.len(),
                    "regulations synchronised"
                );
                self.regulations = remote;
                Some(diff)
            }
            Err(error) => {
                warn!(%error, "regulation source unavailable; keeping last-known table");
                None
            }
        }
    }
}

use super::common::*;
use chrono::Utc;

use crate::underwriting::compliance::{
    ComplianceChecker, DocumentCheckMode, Regulation, RegulationCategory, RegulationError,
    RegulationSource, StaticRegulations,
};
use crate::underwriting::domain::{DocumentCategory, DocumentReference};

struct OfflineRegulations;

impl RegulationSource for OfflineRegulations {
    fn fetch(&self) -> Result<Vec<Regulation>, RegulationError> {
        Err(RegulationError::Unavailable("authority api timed out".to_string()))
    }
}

struct AmendedRegulations;

impl RegulationSource for AmendedRegulations {
    fn fetch(&self) -> Result<Vec<Regulation>, RegulationError> {
        let mut table = StaticRegulations::motor_baseline();
        table[0]
            .requirements
            .push("Emirates ID copy".to_string());
        table.push(Regulation {
            id: "reg-cla-001".to_string(),
            title: "Claims disclosure".to_string(),
            description: "Prior claims must be declared at binding.".to_string(),
            category: RegulationCategory::Claims,
            requirements: vec!["No-claims certificate".to_string()],
            last_updated: Utc::now(),
            source: "UAE Insurance Authority".to_string(),
        });
        Ok(table)
    }
}

#[test]
fn complete_application_is_compliant() {
    let checker = ComplianceChecker::default();
    let result = checker.check(&assessment(), REFERENCE_YEAR);

    assert!(result.is_compliant);
    assert!(result.violations.is_empty());
    assert_eq!(
        result.requirements,
        vec![
            "Valid UAE driving license",
            "Vehicle registration card",
            "Minimum third-party liability coverage",
            "Vehicle inspection certificate",
        ]
    );
}

#[test]
fn every_violated_rule_is_reported() {
    let mut submission = submission();
    submission.coverage.amount = 200_000.0;
    submission.driver.age = 17;
    submission.vehicle_year = REFERENCE_YEAR - 16;
    submission.documents.clear();
    let assessment = assessment_from(submission);

    let result = ComplianceChecker::default().check(&assessment, REFERENCE_YEAR);

    assert!(!result.is_compliant);
    assert_eq!(
        result.violations,
        vec![
            "Coverage amount (200,000 AED) is below minimum requirement of 250,000 AED",
            "Driver must be at least 18 years old",
            "Vehicle exceeds maximum age limit of 15 years",
            "Missing required documents: driver_license, vehicle_registration, insurance_policy",
        ]
    );
}

#[test]
fn fifteen_year_old_vehicle_is_still_acceptable() {
    let mut submission = submission();
    submission.vehicle_year = REFERENCE_YEAR - 15;
    let result = ComplianceChecker::default().check(&assessment_from(submission), REFERENCE_YEAR);
    assert!(result.is_compliant);
}

#[test]
fn only_missing_documents_are_named() {
    let mut submission = submission();
    submission
        .documents
        .retain(|document| document.category != DocumentCategory::InsurancePolicy);
    let result = ComplianceChecker::default().check(&assessment_from(submission), REFERENCE_YEAR);

    assert_eq!(
        result.violations,
        vec!["Missing required documents: insurance_policy"]
    );
}

#[test]
fn name_matching_mode_reads_file_names() {
    let mut submission = submission();
    submission.documents = ["Driver_License.pdf", "vehicle_registration.png", "insurance_policy_2024.pdf"]
        .iter()
        .map(|name| DocumentReference {
            name: name.to_string(),
            category: DocumentCategory::Other,
        })
        .collect();
    let assessment = assessment_from(submission);

    let by_name = ComplianceChecker::new(DocumentCheckMode::NameSubstring);
    assert_eq!(by_name.document_check(), DocumentCheckMode::NameSubstring);
    assert!(by_name.check(&assessment, REFERENCE_YEAR).is_compliant);

    let by_category = ComplianceChecker::new(DocumentCheckMode::Category);
    assert!(!by_category.check(&assessment, REFERENCE_YEAR).is_compliant);
}

#[test]
fn report_renders_status_violations_and_requirements() {
    let mut submission = submission();
    submission.driver.age = 17;
    let checker = ComplianceChecker::default();

    let report = checker.report(&assessment_from(submission), REFERENCE_YEAR);
    assert!(report.starts_with("# Compliance Assessment Report\n\n"));
    assert!(report.contains("## Status: Non-Compliant"));
    assert!(report.contains("## Violations:\n- Driver must be at least 18 years old\n"));
    assert!(report.contains("- Vehicle inspection certificate\n"));

    let clean = checker.report(&assessment(), REFERENCE_YEAR);
    assert!(clean.contains("## Status: Compliant"));
    assert!(!clean.contains("## Violations:"));
}

#[test]
fn failed_refresh_keeps_last_known_table() {
    let mut checker = ComplianceChecker::default();
    let before = checker.regulations().to_vec();

    assert!(checker.refresh_regulations(&OfflineRegulations).is_none());
    assert_eq!(checker.regulations(), before.as_slice());
}

#[test]
fn refresh_replaces_table_and_reports_diff() {
    let mut checker = ComplianceChecker::default();

    let diff = checker
        .refresh_regulations(&AmendedRegulations)
        .expect("source is reachable");

    assert_eq!(diff.added, vec!["Claims disclosure".to_string()]);
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.modified[0].title, "Motor policy documentation");
    assert!(diff.removed.is_empty());
    assert_eq!(checker.regulations().len(), 4);
    assert!(checker
        .requirements()
        .contains(&"No-claims certificate".to_string()));
}

#[test]
fn document_check_mode_parses_config_values() {
    assert_eq!(
        DocumentCheckMode::parse("NAME_SUBSTRING"),
        Some(DocumentCheckMode::NameSubstring)
    );
    assert_eq!(
        DocumentCheckMode::parse("category"),
        Some(DocumentCheckMode::Category)
    );
    assert_eq!(DocumentCheckMode::parse("fuzzy"), None);
}

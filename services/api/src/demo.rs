use crate::infra::{build_service, parse_document_check, parse_scoring_model};
use chrono::{Datelike, Utc};
use clap::Args;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use underwriting::config::{AppConfig, UnderwritingSettings};
use underwriting::error::AppError;
use underwriting::underwriting::{
    ApproverRole, AssessmentComparison, AssessmentSubmission, AuditFilter, CoverageSelection,
    CoverageType, DocumentCategory, DocumentCheckMode, DocumentReference, DriverProfile,
    ScoringModel, UnderwritingReport, UserRole, WorkflowStatus, WorkflowView,
};

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON file holding an assessment submission
    pub(crate) file: PathBuf,
    /// Year used for vehicle-age math (defaults to the configured year, then the current one)
    #[arg(long)]
    pub(crate) reference_year: Option<i32>,
    /// Scoring model override (additive or legacy_severity)
    #[arg(long, value_parser = parse_scoring_model)]
    pub(crate) scoring_model: Option<ScoringModel>,
    /// Document check override (category or name_substring)
    #[arg(long, value_parser = parse_document_check)]
    pub(crate) document_check: Option<DocumentCheckMode>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Year used for vehicle-age math. Defaults to the current year.
    #[arg(long)]
    pub(crate) reference_year: Option<i32>,
    /// Skip the review workflow portion of the demo.
    #[arg(long)]
    pub(crate) skip_workflow: bool,
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs {
        file,
        reference_year,
        scoring_model,
        document_check,
        json,
    } = args;

    let mut settings = AppConfig::load()?.underwriting;
    if let Some(year) = reference_year {
        settings.reference_year = Some(year);
    }
    if let Some(model) = scoring_model {
        settings.scoring_model = model;
    }
    if let Some(mode) = document_check {
        settings.document_check = mode;
    }

    let raw = fs::read_to_string(&file)?;
    let submission: AssessmentSubmission = serde_json::from_str(&raw)?;

    let (service, _, _) = build_service(settings);
    let record = service.submit(submission)?;
    let report = service.evaluate(&record.assessment.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    render_report(&report);
    println!("\n{}", service.compliance_report(&report.assessment_id)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        reference_year,
        skip_workflow,
    } = args;

    let year = reference_year.unwrap_or_else(|| Utc::now().year());
    let settings = UnderwritingSettings {
        reference_year: Some(year),
        ..UnderwritingSettings::default()
    };
    let (service, notifications, audit) = build_service(settings);

    println!("Motor underwriting demo (reference year {year})");

    println!("\n== Family SUV, experienced driver ==");
    let family = service.submit(sample_submission(year))?;
    let family_id = family.assessment.id.clone();
    let report = service.evaluate(&family_id)?;
    render_report(&report);

    println!("\nSigning authority");
    for (approver, user_role) in [
        (ApproverRole::Underwriter, UserRole::Underwriter),
        (ApproverRole::SeniorUnderwriter, UserRole::Underwriter),
        (ApproverRole::Manager, UserRole::Manager),
    ] {
        let check = service.approval_check(&family_id, approver, user_role)?;
        if check.can_finalize {
            println!("  {:<20} may finalize", approver.label());
        } else {
            println!(
                "  {:<20} blocked: {}",
                approver.label(),
                check.blockers.join("; ")
            );
        }
    }

    println!("\n== First car, young driver ==");
    let young = service.submit(young_driver_submission(year))?;
    let young_id = young.assessment.id.clone();
    let report = service.evaluate(&young_id)?;
    render_report(&report);

    service.reassess(&young_id)?;
    let mut revised = young_driver_submission(year);
    revised.vehicle_year = year - 2;
    revised.coverage.coverage_type = CoverageType::Comprehensive;
    revised.coverage.amount = 600_000.0;
    let comparison = service.revise(&young_id, revised)?;
    println!("\nRevised terms for {young_id}");
    render_comparison(&comparison);
    let report = service.evaluate(&young_id)?;
    println!(
        "  re-evaluated: {} at {:.2} ({})",
        report.decision.decision.label(),
        report.decision.risk_score,
        report.status.label()
    );

    if !skip_workflow {
        println!("\n== Review workflow for {family_id} ==");
        let steps = service.initialize_workflow(&family_id)?;
        if let Some(first) = steps.first() {
            service.progress_workflow(
                &family_id,
                &first.id,
                WorkflowStatus::Completed,
                Some("Licence, Mulkiya and prior policy verified".to_string()),
            )?;
        }
        service.escalate_workflow(&family_id, "Sum insured above senior underwriter authority")?;
        render_workflow(&service.workflow(&family_id)?);
    }

    println!("\nNotifications sent: {}", notifications.events().len());
    let mut actions: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in audit.logs(&AuditFilter::default()) {
        *actions.entry(event.action.label()).or_default() += 1;
    }
    println!("Audit trail");
    for (action, count) in actions {
        println!("  {action:<24} {count}");
    }

    Ok(())
}

pub(crate) fn sample_submission(reference_year: i32) -> AssessmentSubmission {
    AssessmentSubmission {
        vehicle_model: "Toyota Land Cruiser".to_string(),
        vehicle_year: reference_year - 2,
        driver: DriverProfile {
            name: "Khalid Al Mansoori".to_string(),
            license_number: "DXB-4471920".to_string(),
            age: 45,
            experience_years: 20,
            previous_accidents: 0,
        },
        coverage: CoverageSelection {
            coverage_type: CoverageType::Comprehensive,
            amount: 1_000_000.0,
            deductible: 5_000.0,
            additional_coverages: vec!["Roadside Assistance".to_string()],
        },
        documents: demo_documents(),
    }
}

fn young_driver_submission(reference_year: i32) -> AssessmentSubmission {
    AssessmentSubmission {
        vehicle_model: "Hyundai Accent".to_string(),
        vehicle_year: reference_year - 7,
        driver: DriverProfile {
            name: "Rashid Al Ketbi".to_string(),
            license_number: "AUH-903315".to_string(),
            age: 22,
            experience_years: 2,
            previous_accidents: 0,
        },
        coverage: CoverageSelection {
            coverage_type: CoverageType::Liability,
            amount: 300_000.0,
            deductible: 1_000.0,
            additional_coverages: Vec::new(),
        },
        documents: demo_documents(),
    }
}

fn demo_documents() -> Vec<DocumentReference> {
    [
        ("driving-licence.pdf", DocumentCategory::DriverLicense),
        ("mulkiya.pdf", DocumentCategory::VehicleRegistration),
        ("previous-policy.pdf", DocumentCategory::InsurancePolicy),
    ]
    .into_iter()
    .map(|(name, category)| DocumentReference {
        name: name.to_string(),
        category,
    })
    .collect()
}

fn render_report(report: &UnderwritingReport) {
    println!(
        "Assessment {} (tracking {})",
        report.assessment_id, report.tracking_number
    );
    println!(
        "  Decision: {} -> {}",
        report.decision.decision.label().to_ascii_uppercase(),
        report.status.label()
    );
    println!("  Reason: {}", report.decision.reason);
    println!(
        "  Risk score: {:.2} ({} risk)",
        report.decision.risk_score,
        report.risk_level.label()
    );
    if let Some(note) = &report.scorer_recommendation {
        println!(
            "  Scorer: {:.0} on the {:?} scale, {note}",
            report.reported_score.value, report.reported_score.scale
        );
    }

    if report.risk_factors.is_empty() {
        println!("  Risk factors: none");
    } else {
        println!("  Risk factors:");
        for factor in &report.risk_factors {
            println!(
                "    - [{}] {}: {}",
                factor.severity.label(),
                factor.name,
                factor.description
            );
        }
    }

    if report.compliance.is_compliant {
        println!("  Compliance: compliant");
    } else {
        println!("  Compliance violations:");
        for violation in &report.compliance.violations {
            println!("    - {violation}");
        }
    }

    if !report.recommendations.is_empty() {
        println!("  Recommendations:");
        for recommendation in &report.recommendations {
            println!("    - {recommendation}");
        }
    }

    match report.approval.required_role {
        Some(role) => {
            println!("  Sign-off required from: {}", role.label());
            for requirement in &report.approval.requirements {
                println!("    - {}", requirement.description);
            }
        }
        None => println!("  Sign-off required from: nobody"),
    }
}

fn render_comparison(comparison: &AssessmentComparison) {
    for change in &comparison.changes {
        println!(
            "  {:<18} {} -> {}",
            change.field.label(),
            change.old_value,
            change.new_value
        );
    }
    println!(
        "  risk impact: {:?}, significant: {}",
        comparison.risk_impact, comparison.significant_changes
    );
}

fn render_workflow(view: &WorkflowView) {
    for step in &view.steps {
        let comment = step.comments.as_deref().unwrap_or("");
        println!(
            "  {:<22} {:<12} {:<7} {comment}",
            step.stage.label(),
            step.status.label(),
            format!("{:?}", step.priority).to_ascii_lowercase(),
        );
    }
    println!(
        "  current stage: {}",
        view.current_stage.map_or("closed", |stage| stage.label())
    );
    println!(
        "  active stage: {}",
        view.active_stage.map_or("none", |stage| stage.label())
    );
}

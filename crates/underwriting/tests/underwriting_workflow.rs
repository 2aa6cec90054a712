//! End-to-end scenarios for motor underwriting: intake, evaluation, approval authority and the
//! review workflow, exercised only through the public service facade and HTTP router.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use underwriting::config::UnderwritingSettings;
    use underwriting::underwriting::{
        AssessmentId, AssessmentNotification, AssessmentRecord, AssessmentRepository,
        AssessmentStatus, AssessmentSubmission, AuditLog, CoverageSelection, CoverageType,
        DocumentCategory, DocumentCheckMode, DocumentReference, DriverProfile, NotificationError,
        NotificationPublisher, RepositoryError, ScoringModel, UnderwritingService,
    };

    pub(super) const REFERENCE_YEAR: i32 = 2025;

    pub(super) fn settings() -> UnderwritingSettings {
        UnderwritingSettings {
            scoring_model: ScoringModel::Additive,
            document_check: DocumentCheckMode::Category,
            reference_year: Some(REFERENCE_YEAR),
        }
    }

    fn documents() -> Vec<DocumentReference> {
        [
            ("licence.pdf", DocumentCategory::DriverLicense),
            ("mulkiya.pdf", DocumentCategory::VehicleRegistration),
            ("policy-2024.pdf", DocumentCategory::InsurancePolicy),
        ]
        .into_iter()
        .map(|(name, category)| DocumentReference {
            name: name.to_string(),
            category,
        })
        .collect()
    }

    pub(super) fn family_suv() -> AssessmentSubmission {
        AssessmentSubmission {
            vehicle_model: "Lexus GX 460".to_string(),
            vehicle_year: REFERENCE_YEAR - 1,
            driver: DriverProfile {
                name: "Fatima Al Suwaidi".to_string(),
                license_number: "SHJ-220193".to_string(),
                age: 52,
                experience_years: 28,
                previous_accidents: 0,
            },
            coverage: CoverageSelection {
                coverage_type: CoverageType::Comprehensive,
                amount: 750_000.0,
                deductible: 2_500.0,
                additional_coverages: vec![
                    "Personal Accident Cover".to_string(),
                    "Roadside Assistance".to_string(),
                    "Natural Disaster Coverage".to_string(),
                ],
            },
            documents: documents(),
        }
    }

    pub(super) fn first_car() -> AssessmentSubmission {
        let mut submission = family_suv();
        submission.vehicle_model = "Kia Picanto".to_string();
        submission.vehicle_year = REFERENCE_YEAR - 6;
        submission.driver.age = 19;
        submission.driver.experience_years = 1;
        submission.coverage.coverage_type = CoverageType::Liability;
        submission.coverage.amount = 260_000.0;
        submission
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryRepository {
        records: Arc<Mutex<HashMap<AssessmentId, AssessmentRecord>>>,
    }

    impl AssessmentRepository for MemoryRepository {
        fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
            let mut guard = self.records.lock().expect("mutex poisoned");
            if guard.contains_key(record.id()) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(record.id().clone(), record.clone());
            Ok(record)
        }

        fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError> {
            self.records
                .lock()
                .expect("mutex poisoned")
                .insert(record.id().clone(), record);
            Ok(())
        }

        fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
            Ok(self.records.lock().expect("mutex poisoned").get(id).cloned())
        }

        fn pending(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .expect("mutex poisoned")
                .values()
                .filter(|record| record.assessment.status == AssessmentStatus::Pending)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[derive(Default, Clone)]
    pub(super) struct MemoryNotifications {
        events: Arc<Mutex<Vec<AssessmentNotification>>>,
    }

    impl MemoryNotifications {
        pub(super) fn subjects(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("mutex poisoned")
                .iter()
                .map(|notification| notification.subject.clone())
                .collect()
        }
    }

    impl NotificationPublisher for MemoryNotifications {
        fn publish(&self, notification: AssessmentNotification) -> Result<(), NotificationError> {
            self.events
                .lock()
                .expect("mutex poisoned")
                .push(notification);
            Ok(())
        }
    }

    pub(super) type Service = UnderwritingService<MemoryRepository, MemoryNotifications, AuditLog>;

    pub(super) fn service() -> (
        Arc<Service>,
        Arc<MemoryRepository>,
        Arc<MemoryNotifications>,
        Arc<AuditLog>,
    ) {
        let repository = Arc::new(MemoryRepository::default());
        let notifications = Arc::new(MemoryNotifications::default());
        let audit = Arc::new(AuditLog::default());
        let service = Arc::new(UnderwritingService::new(
            repository.clone(),
            notifications.clone(),
            audit.clone(),
            settings(),
        ));
        (service, repository, notifications, audit)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use common::*;
use underwriting::underwriting::{
    assessment_router, ApproverRole, Assessment, AssessmentRepository, AssessmentStatus,
    AuditAction, AuditFilter, CoverageType, DecisionKind, UserRole, WorkflowStage,
    WorkflowStatus,
};

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

#[test]
fn clean_family_policy_is_approved_and_fully_audited() {
    let (service, repository, notifications, audit) = service();

    let record = service.submit(family_suv()).expect("submission accepted");
    let id = record.assessment.id.clone();
    let report = service.evaluate(&id).expect("evaluation succeeds");

    assert_eq!(report.decision.decision, DecisionKind::Approve);
    assert_eq!(report.decision.risk_score, 0.20);
    assert!(report.compliance.is_compliant);
    assert_eq!(
        report.recommendations,
        vec!["Consider increasing coverage to recommended level of 1,000,000 AED"]
    );

    let stored = repository.fetch(&id).expect("fetch").expect("stored");
    assert_eq!(stored.assessment.status, AssessmentStatus::Approved);
    assert_eq!(
        notifications.subjects(),
        vec![
            format!("New Assessment Created - {id}"),
            format!("Assessment Approved - {id}"),
        ]
    );

    let decisions = audit.logs(&AuditFilter {
        action: Some(AuditAction::UnderwritingDecision),
        assessment_id: Some(id.clone()),
        ..AuditFilter::default()
    });
    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].details["decision"], "approve");

    let check = service
        .approval_check(&id, ApproverRole::SeniorUnderwriter, UserRole::Manager)
        .expect("approval check");
    assert!(!check.can_finalize, "750k exceeds the senior cap");
    let check = service
        .approval_check(&id, ApproverRole::Manager, UserRole::Manager)
        .expect("approval check");
    assert!(check.can_finalize);
}

#[test]
fn young_driver_is_denied_then_reopened_with_better_terms() {
    let (service, repository, _, _) = service();

    let id = service.submit(first_car()).expect("submit").assessment.id;
    let report = service.evaluate(&id).expect("evaluate");
    // 30 + 25 + 0 + 20 + 25
    assert_eq!(report.decision.risk_score, 1.0);
    assert_eq!(report.decision.decision, DecisionKind::Deny);
    assert_eq!(report.status, AssessmentStatus::Denied);

    service.reassess(&id).expect("denied assessments can reopen");
    let mut improved = first_car();
    improved.coverage.coverage_type = CoverageType::Comprehensive;
    improved.coverage.amount = 600_000.0;
    improved.driver.age = 26;
    improved.driver.experience_years = 8;
    let comparison = service.revise(&id, improved).expect("revise pending");
    assert!(comparison.significant_changes);

    let report = service.evaluate(&id).expect("evaluate revised");
    // 20 + 10 + 0 + 20 + 5
    assert_eq!(report.decision.risk_score, 0.55);
    assert_eq!(report.decision.decision, DecisionKind::Review);
    let stored = repository.fetch(&id).expect("fetch").expect("stored");
    assert_eq!(stored.assessment.status, AssessmentStatus::Pending);
}

#[test]
fn review_workflow_runs_to_client_notification() {
    let (service, _, notifications, _) = service();
    let id = service.submit(family_suv()).expect("submit").assessment.id;

    let steps = service.initialize_workflow(&id).expect("initialize");
    for step in &steps {
        service
            .progress_workflow(&id, &step.id, WorkflowStatus::Completed, None)
            .expect("progress");
    }

    let view = service.workflow(&id).expect("view");
    assert_eq!(view.current_stage, None);
    assert!(view
        .steps
        .iter()
        .all(|step| step.status == WorkflowStatus::Completed && step.completed_at.is_some()));
    assert!(service.escalate_workflow(&id, "too late").is_err());

    let workflow_notices = notifications
        .subjects()
        .into_iter()
        .filter(|subject| subject.starts_with("Workflow"))
        .count();
    assert_eq!(workflow_notices, WorkflowStage::SEQUENCE.len());
}

#[test]
fn assessments_round_trip_through_json() {
    let (service, _, _, _) = service();
    let id = service.submit(first_car()).expect("submit").assessment.id;
    let record = service.get(&id).expect("stored");

    let encoded = serde_json::to_string(&record.assessment).expect("serialize");
    assert!(encoded.contains("\"type\":\"liability\""));
    let decoded: Assessment = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(decoded, record.assessment);
}

#[tokio::test]
async fn http_surface_covers_submission_to_escalation() {
    let (service, _, _, _) = service();
    let router = assessment_router(service);

    let submitted = router
        .clone()
        .oneshot(
            Request::post("/api/v1/assessments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&family_suv()).expect("encode")))
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert_eq!(submitted.status(), StatusCode::ACCEPTED);
    let id = json_body(submitted).await["assessment_id"]
        .as_str()
        .expect("id present")
        .to_string();

    let initialized = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/assessments/{id}/workflow"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert_eq!(initialized.status(), StatusCode::CREATED);

    let escalated = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/assessments/{id}/workflow/escalate"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"reason":"Sum insured needs manager sign-off"}"#))
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert_eq!(escalated.status(), StatusCode::OK);
    let outcome = json_body(escalated).await;
    assert_eq!(outcome["held"]["stage"], "document_verification");
    assert_eq!(
        outcome["held"]["comments"],
        "Escalated: Sum insured needs manager sign-off"
    );

    let malformed = router
        .oneshot(
            Request::post("/api/v1/assessments")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"vehicle_model": 7}"#))
                .expect("request"),
        )
        .await
        .expect("router responds");
    assert!(malformed.status().is_client_error());
}

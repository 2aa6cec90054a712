use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::UnderwritingSettings;
use crate::underwriting::audit::{AuditError, AuditEvent, AuditLog, AuditSink};
use crate::underwriting::compliance::DocumentCheckMode;
use crate::underwriting::domain::{
    Assessment, AssessmentId, AssessmentStatus, CoverageSelection, CoverageType,
    DocumentCategory, DocumentReference, DriverProfile,
};
use crate::underwriting::intake::AssessmentSubmission;
use crate::underwriting::repository::{
    AssessmentNotification, AssessmentRecord, AssessmentRepository, NotificationError,
    NotificationPublisher, RepositoryError,
};
use crate::underwriting::risk::ScoringModel;
use crate::underwriting::{assessment_router, UnderwritingService};

pub(super) const REFERENCE_YEAR: i32 = 2025;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn settings() -> UnderwritingSettings {
    UnderwritingSettings {
        scoring_model: ScoringModel::Additive,
        document_check: DocumentCheckMode::Category,
        reference_year: Some(REFERENCE_YEAR),
    }
}

pub(super) fn documents() -> Vec<DocumentReference> {
    vec![
        DocumentReference {
            name: "Emirates driving licence.pdf".to_string(),
            category: DocumentCategory::DriverLicense,
        },
        DocumentReference {
            name: "Mulkiya scan.jpg".to_string(),
            category: DocumentCategory::VehicleRegistration,
        },
        DocumentReference {
            name: "Previous policy schedule.pdf".to_string(),
            category: DocumentCategory::InsurancePolicy,
        },
    ]
}

/// Seasoned driver, two-year-old car, full comprehensive cover: scores 0.20.
pub(super) fn submission() -> AssessmentSubmission {
    AssessmentSubmission {
        vehicle_model: "Toyota Land Cruiser".to_string(),
        vehicle_year: REFERENCE_YEAR - 2,
        driver: DriverProfile {
            name: "Mariam Al Mansoori".to_string(),
            license_number: "DXB-4471902".to_string(),
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
        documents: documents(),
    }
}

/// Driver age 30 with ten years of experience: scores 0.35 and lands in review.
pub(super) fn review_submission() -> AssessmentSubmission {
    let mut submission = submission();
    submission.driver.age = 30;
    submission.driver.experience_years = 10;
    submission
}

/// Young, inexperienced driver with two accidents on liability cover.
pub(super) fn high_risk_submission() -> AssessmentSubmission {
    let mut submission = submission();
    submission.vehicle_year = REFERENCE_YEAR - 12;
    submission.driver.age = 22;
    submission.driver.experience_years = 1;
    submission.driver.previous_accidents = 2;
    submission.coverage.coverage_type = CoverageType::Liability;
    submission.coverage.amount = 300_000.0;
    submission.coverage.deductible = 500.0;
    submission
}

pub(super) fn assessment() -> Assessment {
    assessment_from(submission())
}

pub(super) fn assessment_from(submission: AssessmentSubmission) -> Assessment {
    let timestamp = now();
    Assessment {
        id: AssessmentId("asm-test".to_string()),
        status: AssessmentStatus::Pending,
        vehicle_model: submission.vehicle_model,
        vehicle_year: submission.vehicle_year,
        driver: submission.driver,
        coverage: submission.coverage,
        documents: submission.documents,
        comments: Vec::new(),
        risk_factors: Vec::new(),
        created_at: timestamp,
        updated_at: timestamp,
        tracking_number: "RA-2025-0001".to_string(),
    }
}

pub(super) type TestService = UnderwritingService<MemoryRepository, MemoryNotifications, AuditLog>;

pub(super) fn build_service() -> (
    TestService,
    Arc<MemoryRepository>,
    Arc<MemoryNotifications>,
    Arc<AuditLog>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let audit = Arc::new(AuditLog::default());
    let service = UnderwritingService::new(
        repository.clone(),
        notifications.clone(),
        audit.clone(),
        settings(),
    );
    (service, repository, notifications, audit)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<AssessmentId, AssessmentRecord>>>,
}

impl AssessmentRepository for MemoryRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id().clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn pending(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
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
    pub(super) fn events(&self) -> Vec<AssessmentNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: AssessmentNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Publisher whose transport is always down.
pub(super) struct OfflineNotifications;

impl NotificationPublisher for OfflineNotifications {
    fn publish(&self, _notification: AssessmentNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

/// Audit sink that rejects every event.
pub(super) struct FailingAudit;

impl AuditSink for FailingAudit {
    fn emit(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit store offline".to_string()))
    }
}

/// In-memory repository whose reads take long enough for concurrent callers to overlap.
#[derive(Default, Clone)]
pub(super) struct SlowRepository {
    pub(super) inner: MemoryRepository,
}

impl AssessmentRepository for SlowRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError> {
        self.inner.update(record)
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        let record = self.inner.fetch(id);
        thread::sleep(Duration::from_millis(50));
        record
    }

    fn pending(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        self.inner.pending(limit)
    }
}

pub(super) struct ConflictRepository;

impl AssessmentRepository for ConflictRepository {
    fn insert(&self, _record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _record: AssessmentRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Ok(None)
    }

    fn pending(&self, _limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl AssessmentRepository for UnavailableRepository {
    fn insert(&self, _record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: AssessmentRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn assert_conflict_response(response: Response) {
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    assessment_router(Arc::new(service))
}

use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;
use underwriting::config::UnderwritingSettings;
use underwriting::underwriting::{
    AssessmentId, AssessmentNotification, AssessmentRecord, AssessmentRepository,
    AssessmentStatus, AuditLog, DocumentCheckMode, NotificationError, NotificationPublisher,
    RepositoryError, ScoringModel, UnderwritingService,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ApiService =
    UnderwritingService<InMemoryAssessmentRepository, LoggingNotificationPublisher, AuditLog>;

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Arc<Mutex<HashMap<AssessmentId, AssessmentRecord>>>,
}

impl InMemoryAssessmentRepository {
    fn lock(&self) -> MutexGuard<'_, HashMap<AssessmentId, AssessmentRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError> {
        let mut guard = self.lock();
        if guard.contains_key(record.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        if guard.contains_key(record.id()) {
            guard.insert(record.id().clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError> {
        Ok(self.lock().get(id).cloned())
    }

    fn pending(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError> {
        let mut pending: Vec<AssessmentRecord> = self
            .lock()
            .values()
            .filter(|record| record.assessment.status == AssessmentStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|left, right| left.assessment.created_at.cmp(&right.assessment.created_at));
        pending.truncate(limit);
        Ok(pending)
    }
}

/// Keeps every notification and mirrors it to the log in place of a mail or push gateway.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPublisher {
    events: Arc<Mutex<Vec<AssessmentNotification>>>,
}

impl NotificationPublisher for LoggingNotificationPublisher {
    fn publish(&self, notification: AssessmentNotification) -> Result<(), NotificationError> {
        info!(
            kind = ?notification.kind,
            subject = %notification.subject,
            "notification published"
        );
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

impl LoggingNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<AssessmentNotification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Service wired to in-process adapters, plus handles on the notification and audit sinks.
pub(crate) fn build_service(
    settings: UnderwritingSettings,
) -> (
    Arc<ApiService>,
    Arc<LoggingNotificationPublisher>,
    Arc<AuditLog>,
) {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    let notifications = Arc::new(LoggingNotificationPublisher::default());
    let audit = Arc::new(AuditLog::default());
    let service = Arc::new(UnderwritingService::new(
        repository,
        notifications.clone(),
        audit.clone(),
        settings,
    ));
    (service, notifications, audit)
}

pub(crate) fn parse_scoring_model(raw: &str) -> Result<ScoringModel, String> {
    ScoringModel::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not a scoring model (expected additive or legacy_severity)"))
}

pub(crate) fn parse_document_check(raw: &str) -> Result<DocumentCheckMode, String> {
    DocumentCheckMode::parse(raw)
        .ok_or_else(|| format!("'{raw}' is not a document check (expected category or name_substring)"))
}

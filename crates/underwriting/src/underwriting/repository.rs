use serde::{Deserialize, Serialize};

use super::decision::Decision;
use super::domain::{Assessment, AssessmentId, AssessmentStatus};

/// Repository record: the assessment plus the latest decision taken on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub assessment: Assessment,
    pub decision: Option<Decision>,
}

impl AssessmentRecord {
    pub fn new(assessment: Assessment) -> Self {
        Self {
            assessment,
            decision: None,
        }
    }

    pub fn id(&self) -> &AssessmentId {
        &self.assessment.id
    }

    pub fn decision_rationale(&self) -> String {
        match &self.decision {
            Some(decision) => decision.summary(),
            None => "pending evaluation".to_string(),
        }
    }

    pub fn status_view(&self) -> AssessmentStatusView {
        AssessmentStatusView {
            assessment_id: self.assessment.id.clone(),
            tracking_number: self.assessment.tracking_number.clone(),
            status: self.assessment.status.label(),
            decision_rationale: self.decision_rationale(),
            risk_score: self.decision.as_ref().map(|decision| decision.risk_score),
        }
    }
}

/// Storage abstraction so the service can be exercised without a database.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, record: AssessmentRecord) -> Result<AssessmentRecord, RepositoryError>;
    fn update(&self, record: AssessmentRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<AssessmentRecord>, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<AssessmentRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, chat, etc).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: AssessmentNotification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Updated,
    Approved,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentNotification {
    pub kind: NotificationKind,
    pub assessment_id: AssessmentId,
    pub subject: String,
    pub body: String,
}

impl AssessmentNotification {
    pub fn for_assessment(kind: NotificationKind, assessment: &Assessment) -> Self {
        let vehicle = format!("{} ({})", assessment.vehicle_model, assessment.vehicle_year);
        let id = &assessment.id;
        let (subject, body) = match kind {
            NotificationKind::Created => (
                format!("New Assessment Created - {id}"),
                format!("A new motor risk assessment has been created for {vehicle}."),
            ),
            NotificationKind::Updated => (
                format!("Assessment Updated - {id}"),
                format!("The motor risk assessment for {vehicle} has been updated."),
            ),
            NotificationKind::Approved => (
                format!("Assessment Approved - {id}"),
                format!("The motor risk assessment for {vehicle} has been approved."),
            ),
            NotificationKind::Denied => (
                format!("Assessment Denied - {id}"),
                format!("The motor risk assessment for {vehicle} has been denied."),
            ),
        };

        Self {
            kind,
            assessment_id: id.clone(),
            subject,
            body,
        }
    }

    /// Workflow notices only know the assessment id and the stage reached.
    pub fn for_workflow(kind: NotificationKind, assessment_id: &AssessmentId, stage: &str) -> Self {
        let subject = match kind {
            NotificationKind::Created => format!("Workflow Started - {assessment_id}"),
            _ => format!("Workflow Updated - {assessment_id}"),
        };
        Self {
            kind,
            assessment_id: assessment_id.clone(),
            subject,
            body: format!("Assessment {assessment_id} is now at the {stage} stage."),
        }
    }

    /// Kind matching a status reached through evaluation, if it warrants a notice.
    pub fn kind_for_status(status: AssessmentStatus) -> Option<NotificationKind> {
        match status {
            AssessmentStatus::Approved => Some(NotificationKind::Approved),
            AssessmentStatus::Denied => Some(NotificationKind::Denied),
            AssessmentStatus::Pending => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Sanitized representation of an assessment's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentStatusView {
    pub assessment_id: AssessmentId,
    pub tracking_number: String,
    pub status: &'static str,
    pub decision_rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::domain::AssessmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AssessmentCreated,
    AssessmentUpdated,
    AssessmentApproved,
    AssessmentDenied,
    CommentAdded,
    ComplianceCheck,
    RiskAssessment,
    UnderwritingDecision,
    WorkflowInitialized,
    WorkflowProgressed,
    WorkflowEscalated,
}

impl AuditAction {
    pub const fn label(self) -> &'static str {
        match self {
            AuditAction::AssessmentCreated => "assessment_created",
            AuditAction::AssessmentUpdated => "assessment_updated",
            AuditAction::AssessmentApproved => "assessment_approved",
            AuditAction::AssessmentDenied => "assessment_denied",
            AuditAction::CommentAdded => "comment_added",
            AuditAction::ComplianceCheck => "compliance_check",
            AuditAction::RiskAssessment => "risk_assessment",
            AuditAction::UnderwritingDecision => "underwriting_decision",
            AuditAction::WorkflowInitialized => "workflow_initialized",
            AuditAction::WorkflowProgressed => "workflow_progressed",
            AuditAction::WorkflowEscalated => "workflow_escalated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub user_id: String,
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AuditEvent {
    /// New event with an empty id; the sink that stores it assigns one.
    pub fn new(action: AuditAction, user_id: &str, details: Value, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            timestamp: now,
            action,
            user_id: user_id.to_string(),
            details,
            metadata: None,
        }
    }

    /// Assessment the event refers to, if its details carry one.
    pub fn assessment_id(&self) -> Option<&str> {
        self.details.get("assessment_id").and_then(Value::as_str)
    }
}

/// Fire-and-forget audit trail. Delivery failures never fail the calling operation.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Emit and log-and-continue on failure.
pub(crate) fn record(sink: &dyn AuditSink, event: AuditEvent) {
    let action = event.action.label();
    if let Err(error) = sink.emit(event) {
        warn!(%error, action, "audit event dropped");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub user_id: Option<String>,
    pub assessment_id: Option<AssessmentId>,
}

impl AuditFilter {
    fn matches(&self, event: &AuditEvent) -> bool {
        self.action.map_or(true, |action| event.action == action)
            && self
                .user_id
                .as_deref()
                .map_or(true, |user| event.user_id == user)
            && self
                .assessment_id
                .as_ref()
                .map_or(true, |id| event.assessment_id() == Some(id.as_str()))
    }
}

/// In-process audit trail, newest event first. Ids number from `log-000001` per log.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: Mutex<Vec<AuditEvent>>,
    sequence: AtomicU64,
}

impl AuditLog {
    pub fn logs(&self, filter: &AuditFilter) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl AuditSink for AuditLog {
    fn emit(&self, mut event: AuditEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".to_string()))?;
        if event.id.is_empty() {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            event.id = format!("log-{sequence:06}");
        }
        events.insert(0, event);
        Ok(())
    }
}

//! Multi-stage review workflow.
//!
//! Steps live in an arena owned by [`WorkflowStore`], indexed per assessment in creation order.
//! Successor semantics are positional: completing a step starts whichever step follows it in that
//! order, not the next stage by enum order.
//!
//! "Current stage" is the first step that is not completed, so an earlier step put on hold stays
//! current even after later steps have started. [`WorkflowStore::active_stage`] reports the most
//! recently started `in_progress` step for callers that want the other reading.

mod engine;
mod store;

pub use engine::{EscalationOutcome, ProgressOutcome, WorkflowEngine, SYSTEM_ACTOR};
pub use store::WorkflowStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::AssessmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    DocumentVerification,
    RiskAssessment,
    ComplianceCheck,
    UnderwriterReview,
    ManagerApproval,
    FinalDecision,
    ClientNotification,
}

impl WorkflowStage {
    pub const SEQUENCE: [WorkflowStage; 7] = [
        WorkflowStage::DocumentVerification,
        WorkflowStage::RiskAssessment,
        WorkflowStage::ComplianceCheck,
        WorkflowStage::UnderwriterReview,
        WorkflowStage::ManagerApproval,
        WorkflowStage::FinalDecision,
        WorkflowStage::ClientNotification,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            WorkflowStage::DocumentVerification => "document_verification",
            WorkflowStage::RiskAssessment => "risk_assessment",
            WorkflowStage::ComplianceCheck => "compliance_check",
            WorkflowStage::UnderwriterReview => "underwriter_review",
            WorkflowStage::ManagerApproval => "manager_approval",
            WorkflowStage::FinalDecision => "final_decision",
            WorkflowStage::ClientNotification => "client_notification",
        }
    }

    /// Stages whose completion records the approval requirements the decision triggers.
    pub const fn requires_sign_off(self) -> bool {
        matches!(
            self,
            WorkflowStage::UnderwriterReview | WorkflowStage::ManagerApproval
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
    OnHold,
}

impl WorkflowStatus {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::OnHold => "on_hold",
        }
    }

    /// Completed or rejected.
    pub const fn is_closed(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: StepId,
    pub assessment_id: AssessmentId,
    pub stage: WorkflowStage,
    pub status: WorkflowStatus,
    pub assigned_to: Option<String>,
    pub comments: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub requirements: Vec<String>,
    pub documents: Vec<String>,
}

/// Fields supplied when a step is created; the store assigns id and start time.
#[derive(Debug, Clone)]
pub(crate) struct NewStep {
    pub assessment_id: AssessmentId,
    pub stage: WorkflowStage,
    pub status: WorkflowStatus,
    pub assigned_to: Option<String>,
    pub priority: Priority,
    pub requirements: Vec<String>,
}

/// Snapshot of one assessment's workflow for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowView {
    pub assessment_id: AssessmentId,
    pub current_stage: Option<WorkflowStage>,
    pub active_stage: Option<WorkflowStage>,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow for {0} has not been initialized")]
    NotInitialized(AssessmentId),
    #[error("workflow for {0} is already initialized")]
    AlreadyInitialized(AssessmentId),
    #[error("step {step_id} does not belong to the workflow for {assessment_id}")]
    StepNotFound {
        assessment_id: AssessmentId,
        step_id: StepId,
    },
    #[error("workflow for {0} is closed")]
    WorkflowClosed(AssessmentId),
}

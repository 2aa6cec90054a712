//! Motor underwriting decision core.
//!
//! Risk scoring, compliance checks, and the decision engine are pure functions over an
//! [`Assessment`] snapshot. The workflow engine and the service hold state; every collaborator
//! they talk to (storage, notifications, audit, permissions, regulation feeds) is a trait
//! injected at construction.

pub mod audit;
pub mod comparison;
pub mod compliance;
pub mod decision;
pub mod domain;
pub mod intake;
pub mod permissions;
pub mod recommendations;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use audit::{AuditAction, AuditError, AuditEvent, AuditFilter, AuditLog, AuditSink};
pub use comparison::{
    compare_assessments, AssessmentComparison, ChangedField, FieldChange, RiskImpact,
};
pub use compliance::{
    ComplianceChecker, ComplianceResult, DocumentCheckMode, Regulation, RegulationDiff,
    RegulationError, RegulationSource, StaticRegulations,
};
pub use decision::{
    ApprovalCheck, ApprovalSummary, ApprovalRequirement, ApproverRole, Decision, DecisionEngine, DecisionKind,
    DecisionRule, FinancialThreshold, ThresholdBook, ThresholdDraft, ThresholdError,
};
pub use domain::{
    Assessment, AssessmentId, AssessmentStatus, Comment, CoverageSelection, CoverageType,
    DocumentCategory, DocumentReference, DriverProfile, RiskFactor, RiskSeverity,
};
pub use intake::{AssessmentIntake, AssessmentSubmission, FieldError, ValidationErrors};
pub use permissions::{Permission, PermissionCheck, RolePermissions, UserRole};
pub use recommendations::generate_recommendations;
pub use repository::{
    AssessmentNotification, AssessmentRecord, AssessmentRepository, AssessmentStatusView,
    NotificationError, NotificationKind, NotificationPublisher, RepositoryError,
};
pub use risk::{extract_risk_factors, RiskScale, RiskScore, RiskScorer, ScoringModel};
pub use router::assessment_router;
pub use service::{CommentDraft, UnderwritingReport, UnderwritingService, UnderwritingServiceError};
pub use workflow::{
    EscalationOutcome, ProgressOutcome, StepId, WorkflowEngine, WorkflowError, WorkflowStage,
    WorkflowStatus, WorkflowStep, WorkflowView,
};

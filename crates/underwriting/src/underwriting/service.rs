use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::audit::{record, AuditAction, AuditEvent, AuditSink};
use super::comparison::{compare_assessments, AssessmentComparison};
use super::compliance::{ComplianceChecker, ComplianceResult, RegulationDiff, RegulationSource};
use super::decision::{
    ApprovalCheck, ApprovalSummary, ApproverRole, Decision, DecisionEngine, DecisionKind,
    ThresholdBook,
};
use super::domain::{AssessmentId, AssessmentStatus, Comment, RiskFactor, RiskSeverity};
use super::intake::{AssessmentIntake, AssessmentSubmission, FieldError, ValidationErrors};
use super::permissions::{PermissionCheck, RolePermissions, UserRole};
use super::recommendations::generate_recommendations;
use super::repository::{
    AssessmentNotification, AssessmentRecord, AssessmentRepository, NotificationKind,
    NotificationPublisher, RepositoryError,
};
use super::risk::{
    extract_risk_factors, legacy_recommendation, risk_level, RiskScale, RiskScore, RiskScorer,
};
use super::workflow::{
    EscalationOutcome, ProgressOutcome, StepId, WorkflowEngine, WorkflowError, WorkflowStatus,
    WorkflowStep, WorkflowView, SYSTEM_ACTOR,
};
use crate::config::UnderwritingSettings;

const MAX_COMMENT_CHARS: usize = 1_000;

/// Comment as supplied by an underwriter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    pub text: String,
    pub author: String,
    #[serde(default)]
    pub is_internal: bool,
}

/// Everything an underwriter needs to act on an evaluated assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnderwritingReport {
    pub assessment_id: AssessmentId,
    pub tracking_number: String,
    pub status: AssessmentStatus,
    pub decision: Decision,
    pub risk_factors: Vec<RiskFactor>,
    pub risk_level: RiskSeverity,
    /// Score from the configured scorer, on that scorer's scale.
    pub reported_score: RiskScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scorer_recommendation: Option<String>,
    pub compliance: ComplianceResult,
    pub recommendations: Vec<String>,
    pub approval: ApprovalSummary,
}

/// Service composing intake, scoring, compliance, decisions and the review workflow.
///
/// Collaborators are injected; nothing is held in process-wide state. Workflow writes go through
/// a single mutex so the successor rule is always checked against the latest step statuses.
/// Read-modify-write operations on one assessment hold that assessment's gate, so concurrent
/// callers see each other's writes.
pub struct UnderwritingService<R, N, A> {
    settings: UnderwritingSettings,
    intake: AssessmentIntake,
    compliance: RwLock<ComplianceChecker>,
    engine: DecisionEngine,
    thresholds: ThresholdBook,
    permissions: Arc<dyn PermissionCheck>,
    workflow: Mutex<WorkflowEngine<N, A>>,
    repository: Arc<R>,
    notifications: Arc<N>,
    audit: Arc<A>,
    comment_sequence: AtomicU64,
    assessment_gates: Mutex<HashMap<AssessmentId, Arc<Mutex<()>>>>,
}

impl<R, N, A> UnderwritingService<R, N, A>
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifications: Arc<N>,
        audit: Arc<A>,
        settings: UnderwritingSettings,
    ) -> Self {
        Self {
            settings,
            intake: AssessmentIntake::default(),
            compliance: RwLock::new(ComplianceChecker::new(settings.document_check)),
            engine: DecisionEngine,
            thresholds: ThresholdBook::standard(Utc::now()),
            permissions: Arc::new(RolePermissions),
            workflow: Mutex::new(WorkflowEngine::new(notifications.clone(), audit.clone())),
            repository,
            notifications,
            audit,
            comment_sequence: AtomicU64::new(1),
            assessment_gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdBook) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionCheck>) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn settings(&self) -> &UnderwritingSettings {
        &self.settings
    }

    pub fn thresholds(&self) -> &ThresholdBook {
        &self.thresholds
    }

    /// Validate and store a new assessment.
    pub fn submit(
        &self,
        submission: AssessmentSubmission,
    ) -> Result<AssessmentRecord, UnderwritingServiceError> {
        let now = Utc::now();
        let assessment =
            self.intake
                .assessment_from_submission(submission, self.reference_year(), now)?;
        let stored = self.repository.insert(AssessmentRecord::new(assessment))?;

        info!(
            assessment_id = %stored.assessment.id,
            tracking_number = %stored.assessment.tracking_number,
            "assessment submitted"
        );
        self.emit_audit(
            AuditAction::AssessmentCreated,
            json!({
                "assessment_id": stored.assessment.id,
                "tracking_number": stored.assessment.tracking_number,
            }),
            now,
        );
        self.notify(AssessmentNotification::for_assessment(
            NotificationKind::Created,
            &stored.assessment,
        ));

        Ok(stored)
    }

    /// Score, check and decide a pending assessment, then apply the verdict to its status.
    pub fn evaluate(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<UnderwritingReport, UnderwritingServiceError> {
        let gate = self.assessment_gate(assessment_id);
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let reference_year = self.reference_year();
        let mut record = self.fetch(assessment_id)?;

        if record.assessment.status != AssessmentStatus::Pending {
            return Err(UnderwritingServiceError::NotPending {
                id: assessment_id.clone(),
                status: record.assessment.status.label(),
            });
        }

        let assessment = &mut record.assessment;
        assessment.risk_factors = extract_risk_factors(assessment, reference_year);
        let scorer = self.settings.scoring_model.scorer(reference_year);
        let reported_score = scorer.score(assessment);
        let compliance = self.read_compliance().check(assessment, reference_year);
        let decision = self.engine.decide(assessment, reference_year);
        let recommendations = generate_recommendations(assessment, reference_year);
        let approval = self.thresholds.approval_summary(
            assessment.coverage.amount,
            decision.risk_score * 100.0,
            assessment.driver.previous_accidents,
        );

        let target = match decision.decision {
            DecisionKind::Approve => AssessmentStatus::Approved,
            DecisionKind::Deny => AssessmentStatus::Denied,
            DecisionKind::Review => AssessmentStatus::Pending,
        };
        let status_changed = target != assessment.status;
        if status_changed {
            assessment.status = target;
        }
        assessment.touch(now);

        record.decision = Some(decision.clone());
        self.repository.update(record.clone())?;
        let assessment = &record.assessment;

        info!(
            assessment_id = %assessment.id,
            decision = decision.decision.label(),
            risk_score = decision.risk_score,
            compliant = compliance.is_compliant,
            "assessment evaluated"
        );

        self.emit_audit(
            AuditAction::RiskAssessment,
            json!({
                "assessment_id": assessment.id,
                "risk_score": decision.risk_score,
                "scoring_model": scorer.model().label(),
                "reported_score": reported_score,
                "risk_factors": assessment.risk_factors.len(),
            }),
            now,
        );
        self.emit_audit(
            AuditAction::ComplianceCheck,
            json!({
                "assessment_id": assessment.id,
                "is_compliant": compliance.is_compliant,
                "violations": compliance.violations,
            }),
            now,
        );
        self.emit_audit(
            AuditAction::UnderwritingDecision,
            json!({
                "assessment_id": assessment.id,
                "decision": decision.decision,
                "risk_score": decision.risk_score,
                "reason": decision.reason,
            }),
            now,
        );

        if status_changed {
            let action = match assessment.status {
                AssessmentStatus::Approved => AuditAction::AssessmentApproved,
                AssessmentStatus::Denied => AuditAction::AssessmentDenied,
                AssessmentStatus::Pending => AuditAction::AssessmentUpdated,
            };
            self.emit_audit(action, json!({ "assessment_id": assessment.id }), now);
            if let Some(kind) = AssessmentNotification::kind_for_status(assessment.status) {
                self.notify(AssessmentNotification::for_assessment(kind, assessment));
            }
        }

        let scorer_recommendation = match reported_score.scale {
            RiskScale::LegacySafety => {
                Some(legacy_recommendation(reported_score.value).to_string())
            }
            RiskScale::UnitRisk => None,
        };

        Ok(UnderwritingReport {
            assessment_id: assessment.id.clone(),
            tracking_number: assessment.tracking_number.clone(),
            status: assessment.status,
            risk_level: risk_level(decision.risk_score),
            risk_factors: assessment.risk_factors.clone(),
            decision,
            reported_score,
            scorer_recommendation,
            compliance,
            recommendations,
            approval,
        })
    }

    /// Reopen a denied assessment. Approved assessments are final.
    pub fn reassess(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<AssessmentRecord, UnderwritingServiceError> {
        let gate = self.assessment_gate(assessment_id);
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let mut record = self.fetch(assessment_id)?;
        let from = record.assessment.status;

        if !from.can_transition_to(AssessmentStatus::Pending) {
            return Err(UnderwritingServiceError::InvalidTransition {
                id: assessment_id.clone(),
                from: from.label(),
                to: AssessmentStatus::Pending.label(),
            });
        }

        record.assessment.status = AssessmentStatus::Pending;
        record.assessment.touch(now);
        record.decision = None;
        self.repository.update(record.clone())?;

        info!(assessment_id = %assessment_id, "assessment reopened for reassessment");
        self.emit_audit(
            AuditAction::AssessmentUpdated,
            json!({
                "assessment_id": assessment_id,
                "from": from,
                "to": AssessmentStatus::Pending,
            }),
            now,
        );
        self.notify(AssessmentNotification::for_assessment(
            NotificationKind::Updated,
            &record.assessment,
        ));

        Ok(record)
    }

    /// Replace the underwriting inputs of a pending assessment and report what moved.
    pub fn revise(
        &self,
        assessment_id: &AssessmentId,
        submission: AssessmentSubmission,
    ) -> Result<AssessmentComparison, UnderwritingServiceError> {
        let now = Utc::now();
        let reference_year = self.reference_year();
        self.intake.validate(&submission, reference_year)?;

        let gate = self.assessment_gate(assessment_id);
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
        let mut record = self.fetch(assessment_id)?;
        if record.assessment.status != AssessmentStatus::Pending {
            return Err(UnderwritingServiceError::NotPending {
                id: assessment_id.clone(),
                status: record.assessment.status.label(),
            });
        }

        let previous = record.assessment.clone();
        let assessment = &mut record.assessment;
        assessment.vehicle_model = submission.vehicle_model.trim().to_string();
        assessment.vehicle_year = submission.vehicle_year;
        assessment.driver = submission.driver;
        assessment.coverage = submission.coverage;
        assessment.documents = submission.documents;
        assessment.risk_factors = extract_risk_factors(assessment, reference_year);
        assessment.touch(now);

        let comparison = compare_assessments(&previous, &record.assessment, reference_year);
        record.decision = None;
        self.repository.update(record)?;

        self.emit_audit(
            AuditAction::AssessmentUpdated,
            json!({
                "assessment_id": assessment_id,
                "changes": comparison.changes.len(),
                "risk_impact": comparison.risk_impact,
                "significant": comparison.significant_changes,
            }),
            now,
        );

        Ok(comparison)
    }

    pub fn add_comment(
        &self,
        assessment_id: &AssessmentId,
        draft: CommentDraft,
    ) -> Result<Comment, UnderwritingServiceError> {
        let now = Utc::now();
        let text = draft.text.trim();
        let length = text.chars().count();
        if length == 0 {
            return Err(comment_error("Comment cannot be empty").into());
        }
        if length > MAX_COMMENT_CHARS {
            return Err(comment_error("Comment must be at most 1,000 characters").into());
        }

        let gate = self.assessment_gate(assessment_id);
        let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
        let mut record = self.fetch(assessment_id)?;
        let sequence = self.comment_sequence.fetch_add(1, Ordering::Relaxed);
        let comment = Comment {
            id: format!("cmt-{sequence:06}"),
            text: text.to_string(),
            author: draft.author,
            created_at: now,
            is_internal: draft.is_internal,
        };
        record.assessment.comments.push(comment.clone());
        record.assessment.touch(now);
        self.repository.update(record)?;

        self.emit_audit(
            AuditAction::CommentAdded,
            json!({ "assessment_id": assessment_id, "comment_id": comment.id }),
            now,
        );

        Ok(comment)
    }

    pub fn get(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<AssessmentRecord, UnderwritingServiceError> {
        self.fetch(assessment_id)
    }

    pub fn compliance(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<ComplianceResult, UnderwritingServiceError> {
        let record = self.fetch(assessment_id)?;
        let result = self
            .read_compliance()
            .check(&record.assessment, self.reference_year());

        self.emit_audit(
            AuditAction::ComplianceCheck,
            json!({
                "assessment_id": assessment_id,
                "is_compliant": result.is_compliant,
                "violations": result.violations,
            }),
            Utc::now(),
        );

        Ok(result)
    }

    pub fn compliance_report(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<String, UnderwritingServiceError> {
        let record = self.fetch(assessment_id)?;
        Ok(self
            .read_compliance()
            .report(&record.assessment, self.reference_year()))
    }

    /// Pull the regulation table from `source`, keeping the current one if the source fails.
    pub fn refresh_regulations(&self, source: &dyn RegulationSource) -> Option<RegulationDiff> {
        self.compliance
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_regulations(source)
    }

    /// Whether `approver` acting as `user_role` may finalize the latest decision alone.
    pub fn approval_check(
        &self,
        assessment_id: &AssessmentId,
        approver: ApproverRole,
        user_role: UserRole,
    ) -> Result<ApprovalCheck, UnderwritingServiceError> {
        let record = self.fetch(assessment_id)?;

        Ok(self.thresholds.approval_check(
            approver,
            user_role,
            self.permissions.as_ref(),
            record.assessment.coverage.amount,
            self.latest_risk_score(&record) * 100.0,
            record.assessment.driver.previous_accidents,
        ))
    }

    pub fn initialize_workflow(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<WorkflowStep>, UnderwritingServiceError> {
        self.fetch(assessment_id)?;
        let steps = self.lock_workflow().initialize(assessment_id, Utc::now())?;
        Ok(steps)
    }

    /// Move a workflow step. Completing underwriter review or manager approval records the
    /// approval requirements of the latest decision, escalating when only a manager may approve.
    pub fn progress_workflow(
        &self,
        assessment_id: &AssessmentId,
        step_id: &StepId,
        status: WorkflowStatus,
        comments: Option<String>,
    ) -> Result<ProgressOutcome, UnderwritingServiceError> {
        let stage = self
            .lock_workflow()
            .store()
            .step(step_id)
            .filter(|step| step.assessment_id == *assessment_id)
            .map(|step| step.stage);
        let sign_off = match stage {
            Some(stage) if status == WorkflowStatus::Completed && stage.requires_sign_off() => {
                Some(self.sign_off(assessment_id)?)
            }
            _ => None,
        };

        let outcome = self.lock_workflow().progress_with_sign_off(
            assessment_id,
            step_id,
            status,
            comments,
            sign_off,
            Utc::now(),
        )?;
        if let Some(summary) = &outcome.sign_off {
            info!(
                assessment_id = %assessment_id,
                stage = outcome.step.stage.label(),
                required_role = summary.required_role.map(ApproverRole::label),
                escalated = outcome.escalation.is_some(),
                "sign-off recorded"
            );
        }
        Ok(outcome)
    }

    pub fn escalate_workflow(
        &self,
        assessment_id: &AssessmentId,
        reason: &str,
    ) -> Result<EscalationOutcome, UnderwritingServiceError> {
        let outcome = self
            .lock_workflow()
            .escalate(assessment_id, reason, Utc::now())?;
        Ok(outcome)
    }

    pub fn workflow(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<WorkflowView, UnderwritingServiceError> {
        let view = self.lock_workflow().view(assessment_id)?;
        Ok(view)
    }

    pub fn workflow_history(&self, assessment_id: &AssessmentId) -> Vec<WorkflowStep> {
        self.lock_workflow().history(assessment_id)
    }

    fn fetch(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<AssessmentRecord, UnderwritingServiceError> {
        let record = self
            .repository
            .fetch(assessment_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Gate serializing read-modify-write cycles on one assessment.
    fn assessment_gate(&self, assessment_id: &AssessmentId) -> Arc<Mutex<()>> {
        self.assessment_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(assessment_id.clone())
            .or_default()
            .clone()
    }

    /// Risk score of the stored decision, or a fresh one if the assessment was never decided.
    fn latest_risk_score(&self, record: &AssessmentRecord) -> f64 {
        match &record.decision {
            Some(decision) => decision.risk_score,
            None => {
                self.engine
                    .decide(&record.assessment, self.reference_year())
                    .risk_score
            }
        }
    }

    fn sign_off(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<ApprovalSummary, UnderwritingServiceError> {
        let record = self.fetch(assessment_id)?;
        Ok(self.thresholds.approval_summary(
            record.assessment.coverage.amount,
            self.latest_risk_score(&record) * 100.0,
            record.assessment.driver.previous_accidents,
        ))
    }

    fn reference_year(&self) -> i32 {
        self.settings.reference_year()
    }

    fn read_compliance(&self) -> RwLockReadGuard<'_, ComplianceChecker> {
        self.compliance.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_workflow(&self) -> MutexGuard<'_, WorkflowEngine<N, A>> {
        self.workflow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_audit(&self, action: AuditAction, details: serde_json::Value, now: DateTime<Utc>) {
        record(
            self.audit.as_ref(),
            AuditEvent::new(action, SYSTEM_ACTOR, details, now),
        );
    }

    fn notify(&self, notification: AssessmentNotification) {
        let kind = notification.kind;
        if let Err(error) = self.notifications.publish(notification) {
            warn!(%error, ?kind, "assessment notification dropped");
        }
    }
}

fn comment_error(message: &'static str) -> ValidationErrors {
    ValidationErrors(vec![FieldError {
        field: "text",
        message,
    }])
}

/// Error raised by the underwriting service.
#[derive(Debug, thiserror::Error)]
pub enum UnderwritingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("assessment {id} is {status}; only pending assessments can be changed")]
    NotPending {
        id: AssessmentId,
        status: &'static str,
    },
    #[error("assessment {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: AssessmentId,
        from: &'static str,
        to: &'static str,
    },
}

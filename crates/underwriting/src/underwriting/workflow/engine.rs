use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::super::audit::{record, AuditAction, AuditEvent, AuditSink};
use super::super::decision::ApprovalSummary;
use super::super::domain::AssessmentId;
use super::super::repository::{AssessmentNotification, NotificationKind, NotificationPublisher};
use super::store::WorkflowStore;
use super::{
    NewStep, Priority, StepId, WorkflowError, WorkflowStage, WorkflowStatus, WorkflowStep,
    WorkflowView,
};

/// Actor recorded on events raised by the engine itself.
pub const SYSTEM_ACTOR: &str = "system";

const ESCALATION_REQUIREMENTS: [&str; 2] = ["Review escalation reason", "Verify documentation"];
const MANAGER_SIGN_OFF_REASON: &str = "Approval requirements call for manager sign-off";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressOutcome {
    pub step: WorkflowStep,
    /// Successor moved from pending to in progress, if any.
    pub started: Option<WorkflowStep>,
    /// Requirements recorded when a sign-off stage completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_off: Option<ApprovalSummary>,
    /// Raised when underwriter review completes on a policy only a manager may approve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationOutcome {
    pub held: WorkflowStep,
    /// Manager approval step added because none existed.
    pub injected: Option<WorkflowStep>,
}

/// Stateful controller sequencing assessments through the review stages.
///
/// Every transition emits an audit event. Audit and notification failures are logged and
/// never fail the transition.
pub struct WorkflowEngine<N, A> {
    store: WorkflowStore,
    notifications: Arc<N>,
    audit: Arc<A>,
}

impl<N, A> WorkflowEngine<N, A>
where
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    pub fn new(notifications: Arc<N>, audit: Arc<A>) -> Self {
        Self {
            store: WorkflowStore::default(),
            notifications,
            audit,
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut WorkflowStore {
        &mut self.store
    }

    /// Create one step per stage. The first starts immediately.
    pub fn initialize(
        &mut self,
        assessment_id: &AssessmentId,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkflowStep>, WorkflowError> {
        if self.store.is_initialized(assessment_id) {
            return Err(WorkflowError::AlreadyInitialized(assessment_id.clone()));
        }

        let steps: Vec<WorkflowStep> = WorkflowStage::SEQUENCE
            .iter()
            .enumerate()
            .map(|(position, stage)| {
                let status = if position == 0 {
                    WorkflowStatus::InProgress
                } else {
                    WorkflowStatus::Pending
                };
                self.store
                    .add_step(
                        NewStep {
                            assessment_id: assessment_id.clone(),
                            stage: *stage,
                            status,
                            assigned_to: Some(SYSTEM_ACTOR.to_string()),
                            priority: Priority::Medium,
                            requirements: Vec::new(),
                        },
                        now,
                    )
                    .clone()
            })
            .collect();

        info!(assessment_id = %assessment_id, steps = steps.len(), "workflow initialized");
        self.emit_audit(
            AuditAction::WorkflowInitialized,
            json!({ "assessment_id": assessment_id }),
            now,
        );
        self.notify(AssessmentNotification::for_workflow(
            NotificationKind::Created,
            assessment_id,
            WorkflowStage::SEQUENCE[0].label(),
        ));

        Ok(steps)
    }

    /// Set a step's status. Completing a step starts its positional successor if still pending.
    pub fn progress(
        &mut self,
        assessment_id: &AssessmentId,
        step_id: &StepId,
        status: WorkflowStatus,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ProgressOutcome, WorkflowError> {
        self.progress_with_sign_off(assessment_id, step_id, status, comments, None, now)
    }

    /// Like [`progress`](Self::progress), recording `sign_off` when a sign-off stage completes.
    ///
    /// Completing underwriter review escalates the workflow when the sign-off needs a manager.
    pub fn progress_with_sign_off(
        &mut self,
        assessment_id: &AssessmentId,
        step_id: &StepId,
        status: WorkflowStatus,
        comments: Option<String>,
        sign_off: Option<ApprovalSummary>,
        now: DateTime<Utc>,
    ) -> Result<ProgressOutcome, WorkflowError> {
        if !self.store.is_initialized(assessment_id) {
            return Err(WorkflowError::NotInitialized(assessment_id.clone()));
        }
        if self.store.is_closed(assessment_id) {
            return Err(WorkflowError::WorkflowClosed(assessment_id.clone()));
        }

        let slots = self.store.slots(assessment_id).to_vec();
        let position = slots
            .iter()
            .position(|slot| self.store.step_at(*slot).id == *step_id)
            .ok_or_else(|| WorkflowError::StepNotFound {
                assessment_id: assessment_id.clone(),
                step_id: step_id.clone(),
            })?;

        let step = self.store.step_at_mut(slots[position]);
        step.status = status;
        if let Some(comments) = comments.clone() {
            step.comments = Some(comments);
        }
        step.completed_at = status.is_closed().then_some(now.max(step.started_at));
        let step = step.clone();

        let mut started = None;
        if status == WorkflowStatus::Completed {
            if let Some(next_slot) = slots.get(position + 1) {
                let next = self.store.step_at_mut(*next_slot);
                if next.status == WorkflowStatus::Pending {
                    next.status = WorkflowStatus::InProgress;
                    next.started_at = now;
                    started = Some(next.clone());
                }
            }
        }

        info!(
            assessment_id = %assessment_id,
            step_id = %step_id,
            stage = step.stage.label(),
            status = status.label(),
            "workflow step progressed"
        );

        if let Some(next) = &started {
            self.notify(AssessmentNotification::for_workflow(
                NotificationKind::Updated,
                assessment_id,
                next.stage.label(),
            ));
        }

        let sign_off = sign_off
            .filter(|_| status == WorkflowStatus::Completed && step.stage.requires_sign_off());

        self.emit_audit(
            AuditAction::WorkflowProgressed,
            json!({
                "assessment_id": assessment_id,
                "step_id": step_id,
                "status": status,
                "comments": comments,
                "sign_off": sign_off,
            }),
            now,
        );

        let escalation = match &sign_off {
            Some(summary)
                if step.stage == WorkflowStage::UnderwriterReview && summary.needs_manager() =>
            {
                match self.escalate(assessment_id, MANAGER_SIGN_OFF_REASON, now) {
                    Ok(outcome) => Some(outcome),
                    Err(error) => {
                        warn!(%error, assessment_id = %assessment_id, "sign-off escalation skipped");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(ProgressOutcome {
            step,
            started,
            sign_off,
            escalation,
        })
    }

    /// Put the current stage on hold and make sure a manager approval step exists.
    pub fn escalate(
        &mut self,
        assessment_id: &AssessmentId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<EscalationOutcome, WorkflowError> {
        if !self.store.is_initialized(assessment_id) {
            return Err(WorkflowError::NotInitialized(assessment_id.clone()));
        }
        if self.store.is_closed(assessment_id) {
            return Err(WorkflowError::WorkflowClosed(assessment_id.clone()));
        }
        let slot = self
            .store
            .current_slot(assessment_id)
            .ok_or_else(|| WorkflowError::WorkflowClosed(assessment_id.clone()))?;

        let held = self.store.step_at_mut(slot);
        held.status = WorkflowStatus::OnHold;
        held.priority = Priority::High;
        held.comments = Some(format!("Escalated: {reason}"));
        held.completed_at = None;
        let held = held.clone();

        let injected = if self
            .store
            .has_stage(assessment_id, WorkflowStage::ManagerApproval)
        {
            None
        } else {
            let step = self.store.add_step(
                NewStep {
                    assessment_id: assessment_id.clone(),
                    stage: WorkflowStage::ManagerApproval,
                    status: WorkflowStatus::Pending,
                    assigned_to: None,
                    priority: Priority::High,
                    requirements: ESCALATION_REQUIREMENTS
                        .iter()
                        .map(|requirement| requirement.to_string())
                        .collect(),
                },
                now,
            );
            Some(step.clone())
        };

        warn!(
            assessment_id = %assessment_id,
            stage = held.stage.label(),
            reason,
            "workflow escalated"
        );
        self.emit_audit(
            AuditAction::WorkflowEscalated,
            json!({ "assessment_id": assessment_id, "reason": reason }),
            now,
        );

        Ok(EscalationOutcome { held, injected })
    }

    pub fn current_stage(&self, assessment_id: &AssessmentId) -> Option<WorkflowStage> {
        self.store.current_stage(assessment_id)
    }

    pub fn active_stage(&self, assessment_id: &AssessmentId) -> Option<WorkflowStage> {
        self.store.active_stage(assessment_id)
    }

    pub fn history(&self, assessment_id: &AssessmentId) -> Vec<WorkflowStep> {
        self.store.history(assessment_id)
    }

    pub fn view(&self, assessment_id: &AssessmentId) -> Result<WorkflowView, WorkflowError> {
        if !self.store.is_initialized(assessment_id) {
            return Err(WorkflowError::NotInitialized(assessment_id.clone()));
        }
        Ok(self.store.view(assessment_id))
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
            warn!(%error, ?kind, "workflow notification dropped");
        }
    }
}

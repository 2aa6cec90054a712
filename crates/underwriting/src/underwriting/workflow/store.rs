use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::super::domain::AssessmentId;
use super::{NewStep, StepId, WorkflowStage, WorkflowStatus, WorkflowStep, WorkflowView};

/// Arena of steps plus an assessment -> positions index. Steps are never removed.
#[derive(Debug, Default)]
pub struct WorkflowStore {
    steps: Vec<WorkflowStep>,
    by_assessment: HashMap<AssessmentId, Vec<usize>>,
    by_id: HashMap<StepId, usize>,
    next_id: u64,
}

impl WorkflowStore {
    pub(crate) fn add_step(&mut self, new: NewStep, now: DateTime<Utc>) -> &WorkflowStep {
        self.next_id += 1;
        let id = StepId(format!("step-{:06}", self.next_id));
        let slot = self.steps.len();

        self.steps.push(WorkflowStep {
            id: id.clone(),
            assessment_id: new.assessment_id.clone(),
            stage: new.stage,
            status: new.status,
            assigned_to: new.assigned_to,
            comments: None,
            started_at: now,
            completed_at: None,
            due_date: None,
            priority: new.priority,
            requirements: new.requirements,
            documents: Vec::new(),
        });
        self.by_assessment
            .entry(new.assessment_id)
            .or_default()
            .push(slot);
        self.by_id.insert(id, slot);

        &self.steps[slot]
    }

    pub fn is_initialized(&self, assessment_id: &AssessmentId) -> bool {
        self.by_assessment
            .get(assessment_id)
            .is_some_and(|slots| !slots.is_empty())
    }

    pub fn step(&self, step_id: &StepId) -> Option<&WorkflowStep> {
        self.by_id.get(step_id).map(|slot| &self.steps[*slot])
    }

    pub(crate) fn step_at(&self, slot: usize) -> &WorkflowStep {
        &self.steps[slot]
    }

    pub(crate) fn step_at_mut(&mut self, slot: usize) -> &mut WorkflowStep {
        &mut self.steps[slot]
    }

    /// Arena slots for the assessment, in creation order.
    pub(crate) fn slots(&self, assessment_id: &AssessmentId) -> &[usize] {
        self.by_assessment
            .get(assessment_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Steps for the assessment in creation order.
    pub fn steps_for(&self, assessment_id: &AssessmentId) -> Vec<&WorkflowStep> {
        self.slots(assessment_id)
            .iter()
            .map(|slot| &self.steps[*slot])
            .collect()
    }

    /// First step that is not completed. On-hold and rejected steps count as current.
    pub(crate) fn current_slot(&self, assessment_id: &AssessmentId) -> Option<usize> {
        self.slots(assessment_id)
            .iter()
            .copied()
            .find(|slot| self.steps[*slot].status != WorkflowStatus::Completed)
    }

    pub fn current_stage(&self, assessment_id: &AssessmentId) -> Option<WorkflowStage> {
        self.current_slot(assessment_id)
            .map(|slot| self.steps[slot].stage)
    }

    /// Most recently started step still in progress. Ties go to the later position.
    pub fn active_stage(&self, assessment_id: &AssessmentId) -> Option<WorkflowStage> {
        self.slots(assessment_id)
            .iter()
            .map(|slot| &self.steps[*slot])
            .filter(|step| step.status == WorkflowStatus::InProgress)
            .max_by_key(|step| step.started_at)
            .map(|step| step.stage)
    }

    /// Steps ordered by start time, creation order breaking ties.
    pub fn history(&self, assessment_id: &AssessmentId) -> Vec<WorkflowStep> {
        let mut steps: Vec<WorkflowStep> = self
            .steps_for(assessment_id)
            .into_iter()
            .cloned()
            .collect();
        steps.sort_by_key(|step| step.started_at);
        steps
    }

    pub fn has_stage(&self, assessment_id: &AssessmentId, stage: WorkflowStage) -> bool {
        self.steps_for(assessment_id)
            .iter()
            .any(|step| step.stage == stage)
    }

    /// The workflow ends once its client notification step is completed or rejected.
    pub fn is_closed(&self, assessment_id: &AssessmentId) -> bool {
        self.steps_for(assessment_id).iter().any(|step| {
            step.stage == WorkflowStage::ClientNotification && step.status.is_closed()
        })
    }

    pub fn view(&self, assessment_id: &AssessmentId) -> WorkflowView {
        WorkflowView {
            assessment_id: assessment_id.clone(),
            current_stage: self.current_stage(assessment_id),
            active_stage: self.active_stage(assessment_id),
            steps: self
                .steps_for(assessment_id)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::permissions::{Permission, PermissionCheck, UserRole};

/// Claims above this count always need manager sign-off.
pub const CLAIMS_HISTORY_LIMIT: u32 = 2;

/// Signing authority tiers, ordered from least to most senior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Underwriter,
    SeniorUnderwriter,
    Manager,
}

impl ApproverRole {
    pub const fn label(self) -> &'static str {
        match self {
            ApproverRole::Underwriter => "underwriter",
            ApproverRole::SeniorUnderwriter => "senior_underwriter",
            ApproverRole::Manager => "manager",
        }
    }
}

/// Caps on what a role may approve. `max_risk_score` is on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialThreshold {
    pub id: String,
    pub role: ApproverRole,
    pub max_policy_value: f64,
    pub max_risk_score: f64,
    pub requires_escalation: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalation_rules: Vec<EscalationRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub id: String,
    pub condition: EscalationCondition,
    pub threshold: f64,
    pub escalate_to: ApproverRole,
    pub auto_escalate: bool,
    pub notify_users: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationCondition {
    Value,
    Risk,
    Claims,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequirement {
    pub id: String,
    pub condition: RequirementCondition,
    pub threshold: f64,
    pub required_role: ApproverRole,
    pub description: String,
}

/// Requirements a policy triggers and the most senior role they call for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalSummary {
    pub requirements: Vec<ApprovalRequirement>,
    pub required_role: Option<ApproverRole>,
}

impl ApprovalSummary {
    pub fn needs_manager(&self) -> bool {
        self.required_role == Some(ApproverRole::Manager)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCondition {
    PolicyValue,
    RiskScore,
    ClaimsHistory,
    SpecialCoverage,
}

/// Fields accepted when creating or editing a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDraft {
    pub role: ApproverRole,
    pub max_policy_value: f64,
    pub max_risk_score: f64,
    pub requires_escalation: bool,
    #[serde(default)]
    pub escalation_rules: Vec<EscalationRule>,
}

#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold {0} not found")]
    NotFound(String),
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: &'static str,
    },
}

/// Escalation verdict for one approver looking at one policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalCheck {
    pub requirements: Vec<ApprovalRequirement>,
    pub required_role: Option<ApproverRole>,
    pub escalations: Vec<EscalationRule>,
    pub can_finalize: bool,
    pub blockers: Vec<String>,
}

/// Threshold and approval-requirement tables.
#[derive(Debug, Clone)]
pub struct ThresholdBook {
    thresholds: Vec<FinancialThreshold>,
    requirements: Vec<ApprovalRequirement>,
    next_id: u64,
}

impl ThresholdBook {
    pub fn standard(now: DateTime<Utc>) -> Self {
        let threshold = |id: &str, role, max_policy_value, max_risk_score, requires_escalation| {
            FinancialThreshold {
                id: id.to_string(),
                role,
                max_policy_value,
                max_risk_score,
                requires_escalation,
                escalation_rules: Vec::new(),
                created_at: now,
                updated_at: now,
            }
        };
        let requirement = |id: &str, condition, threshold, required_role, description: &str| {
            ApprovalRequirement {
                id: id.to_string(),
                condition,
                threshold,
                required_role,
                description: description.to_string(),
            }
        };

        Self {
            thresholds: vec![
                threshold("th-1", ApproverRole::Underwriter, 250_000.0, 40.0, false),
                threshold("th-2", ApproverRole::SeniorUnderwriter, 500_000.0, 60.0, false),
                threshold("th-3", ApproverRole::Manager, 1_000_000.0, 80.0, true),
            ],
            requirements: vec![
                requirement(
                    "req-1",
                    RequirementCondition::PolicyValue,
                    250_000.0,
                    ApproverRole::Underwriter,
                    "Standard policies up to 250,000 AED",
                ),
                requirement(
                    "req-2",
                    RequirementCondition::RiskScore,
                    60.0,
                    ApproverRole::SeniorUnderwriter,
                    "High-risk policies (score > 60)",
                ),
                requirement(
                    "req-3",
                    RequirementCondition::ClaimsHistory,
                    f64::from(CLAIMS_HISTORY_LIMIT),
                    ApproverRole::Manager,
                    "Multiple claims history",
                ),
                requirement(
                    "req-4",
                    RequirementCondition::SpecialCoverage,
                    0.0,
                    ApproverRole::SeniorUnderwriter,
                    "Non-standard coverage requirements",
                ),
            ],
            next_id: 4,
        }
    }

    pub fn thresholds(&self) -> &[FinancialThreshold] {
        &self.thresholds
    }

    pub fn requirements(&self) -> &[ApprovalRequirement] {
        &self.requirements
    }

    pub fn threshold_for(&self, role: ApproverRole) -> Option<&FinancialThreshold> {
        self.thresholds.iter().find(|threshold| threshold.role == role)
    }

    pub fn add_threshold(
        &mut self,
        draft: ThresholdDraft,
        now: DateTime<Utc>,
    ) -> Result<&FinancialThreshold, ThresholdError> {
        validate_draft(&draft)?;

        let id = format!("th-{}", self.next_id);
        self.next_id += 1;
        self.thresholds.push(FinancialThreshold {
            id,
            role: draft.role,
            max_policy_value: draft.max_policy_value,
            max_risk_score: draft.max_risk_score,
            requires_escalation: draft.requires_escalation,
            escalation_rules: draft.escalation_rules,
            created_at: now,
            updated_at: now,
        });

        Ok(&self.thresholds[self.thresholds.len() - 1])
    }

    pub fn update_threshold(
        &mut self,
        id: &str,
        draft: ThresholdDraft,
        now: DateTime<Utc>,
    ) -> Result<(), ThresholdError> {
        validate_draft(&draft)?;

        let threshold = self
            .thresholds
            .iter_mut()
            .find(|threshold| threshold.id == id)
            .ok_or_else(|| ThresholdError::NotFound(id.to_string()))?;

        threshold.role = draft.role;
        threshold.max_policy_value = draft.max_policy_value;
        threshold.max_risk_score = draft.max_risk_score;
        threshold.requires_escalation = draft.requires_escalation;
        threshold.escalation_rules = draft.escalation_rules;
        threshold.updated_at = now.max(threshold.created_at);
        Ok(())
    }

    pub fn delete_threshold(&mut self, id: &str) -> Result<FinancialThreshold, ThresholdError> {
        let index = self
            .thresholds
            .iter()
            .position(|threshold| threshold.id == id)
            .ok_or_else(|| ThresholdError::NotFound(id.to_string()))?;
        Ok(self.thresholds.remove(index))
    }

    /// Requirements whose threshold the policy exceeds. Special coverage always applies.
    pub fn check_approval_requirements(
        &self,
        policy_value: f64,
        risk_score: f64,
        claims_count: u32,
    ) -> Vec<ApprovalRequirement> {
        self.requirements
            .iter()
            .filter(|requirement| match requirement.condition {
                RequirementCondition::PolicyValue => policy_value > requirement.threshold,
                RequirementCondition::RiskScore => risk_score > requirement.threshold,
                RequirementCondition::ClaimsHistory => {
                    f64::from(claims_count) > requirement.threshold
                }
                RequirementCondition::SpecialCoverage => true,
            })
            .cloned()
            .collect()
    }

    /// Most senior role demanded by the triggered requirements.
    pub fn required_role(
        &self,
        policy_value: f64,
        risk_score: f64,
        claims_count: u32,
    ) -> Option<ApproverRole> {
        self.approval_summary(policy_value, risk_score, claims_count)
            .required_role
    }

    pub fn approval_summary(
        &self,
        policy_value: f64,
        risk_score: f64,
        claims_count: u32,
    ) -> ApprovalSummary {
        let requirements = self.check_approval_requirements(policy_value, risk_score, claims_count);
        let required_role = requirements
            .iter()
            .map(|requirement| requirement.required_role)
            .max();
        ApprovalSummary {
            requirements,
            required_role,
        }
    }

    /// Escalation rules configured on `role` that the policy trips.
    pub fn triggered_escalations(
        &self,
        role: ApproverRole,
        policy_value: f64,
        risk_score: f64,
        claims_count: u32,
    ) -> Vec<EscalationRule> {
        let Some(threshold) = self.threshold_for(role) else {
            return Vec::new();
        };

        threshold
            .escalation_rules
            .iter()
            .filter(|rule| match rule.condition {
                EscalationCondition::Value => policy_value > rule.threshold,
                EscalationCondition::Risk => risk_score > rule.threshold,
                EscalationCondition::Claims => f64::from(claims_count) > rule.threshold,
            })
            .cloned()
            .collect()
    }

    /// Whether the role's own caps cover the policy and the user holds approve rights.
    pub fn can_finalize(
        &self,
        approver: ApproverRole,
        user_role: UserRole,
        permissions: &dyn PermissionCheck,
        policy_value: f64,
        risk_score: f64,
    ) -> bool {
        permissions.has_permission(user_role, Permission::ApproveAssessment)
            && self.threshold_for(approver).is_some_and(|threshold| {
                policy_value <= threshold.max_policy_value
                    && risk_score <= threshold.max_risk_score
            })
    }

    /// Full escalation verdict: caps, permissions, required sign-off and auto-escalation rules.
    pub fn approval_check(
        &self,
        approver: ApproverRole,
        user_role: UserRole,
        permissions: &dyn PermissionCheck,
        policy_value: f64,
        risk_score: f64,
        claims_count: u32,
    ) -> ApprovalCheck {
        let requirements = self.check_approval_requirements(policy_value, risk_score, claims_count);
        let required_role = requirements
            .iter()
            .map(|requirement| requirement.required_role)
            .max();
        let escalations =
            self.triggered_escalations(approver, policy_value, risk_score, claims_count);
        let mut blockers = Vec::new();

        if !permissions.has_permission(user_role, Permission::ApproveAssessment) {
            blockers.push(format!("{user_role:?} lacks approve permission"));
        }

        match self.threshold_for(approver) {
            Some(threshold) => {
                if policy_value > threshold.max_policy_value {
                    blockers.push(format!(
                        "policy value exceeds {} cap",
                        approver.label()
                    ));
                }
                if risk_score > threshold.max_risk_score {
                    blockers.push(format!("risk score exceeds {} cap", approver.label()));
                }
            }
            None => blockers.push(format!(
                "no financial threshold configured for {}",
                approver.label()
            )),
        }

        if let Some(required) = required_role {
            if required > approver {
                blockers.push(format!("requires {} sign-off", required.label()));
            }
        }

        if let Some(rule) = escalations.iter().find(|rule| rule.auto_escalate) {
            blockers.push(format!(
                "escalation rule {} routes to {}",
                rule.id,
                rule.escalate_to.label()
            ));
        }

        ApprovalCheck {
            requirements,
            required_role,
            escalations,
            can_finalize: blockers.is_empty(),
            blockers,
        }
    }
}

fn validate_draft(draft: &ThresholdDraft) -> Result<(), ThresholdError> {
    if !draft.max_policy_value.is_finite() || draft.max_policy_value < 0.0 {
        return Err(ThresholdError::Invalid {
            field: "max_policy_value",
            message: "Value must be positive",
        });
    }
    if !draft.max_risk_score.is_finite() || draft.max_risk_score < 0.0 {
        return Err(ThresholdError::Invalid {
            field: "max_risk_score",
            message: "Score must be positive",
        });
    }
    if draft.max_risk_score > 100.0 {
        return Err(ThresholdError::Invalid {
            field: "max_risk_score",
            message: "Maximum score is 100",
        });
    }
    Ok(())
}

mod thresholds;

pub use thresholds::{
    ApprovalCheck, ApprovalSummary, ApprovalRequirement, ApproverRole, EscalationCondition, EscalationRule,
    FinancialThreshold, RequirementCondition, ThresholdBook, ThresholdDraft, ThresholdError,
    CLAIMS_HISTORY_LIMIT,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{format_amount, Assessment, CoverageType};
use super::risk::{additive_breakdown, additive_risk_score, ScoreComponent};

pub const MAX_PREVIOUS_ACCIDENTS: u32 = 3;
pub const MINIMUM_DRIVER_AGE: u8 = 18;
pub const APPROVE_THRESHOLD: f64 = 0.30;
pub const REVIEW_THRESHOLD: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Deny,
    Review,
}

impl DecisionKind {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionKind::Approve => "approve",
            DecisionKind::Deny => "deny",
            DecisionKind::Review => "review",
        }
    }
}

/// The rule that settled a decision. Rules are tried in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DecisionRule {
    ExcessiveAccidents {
        count: u32,
    },
    UnderAge {
        age: u8,
    },
    InsufficientCoverage {
        coverage_type: CoverageType,
        minimum: f64,
        actual: f64,
    },
    LowRisk,
    ModerateRisk,
    HighRisk,
}

impl DecisionRule {
    pub fn kind(&self) -> DecisionKind {
        match self {
            DecisionRule::LowRisk => DecisionKind::Approve,
            DecisionRule::ModerateRisk => DecisionKind::Review,
            DecisionRule::ExcessiveAccidents { .. }
            | DecisionRule::UnderAge { .. }
            | DecisionRule::InsufficientCoverage { .. }
            | DecisionRule::HighRisk => DecisionKind::Deny,
        }
    }

    pub fn reason(&self) -> String {
        match self {
            DecisionRule::ExcessiveAccidents { .. } => {
                "Too many previous accidents (more than 3)".to_string()
            }
            DecisionRule::UnderAge { .. } => "Driver below minimum age requirement".to_string(),
            DecisionRule::InsufficientCoverage {
                minimum, actual, ..
            } => format!(
                "Coverage amount below minimum requirement of {} AED (short by {} AED)",
                format_amount(*minimum),
                format_amount(minimum - actual)
            ),
            DecisionRule::LowRisk => "Low risk profile with adequate coverage".to_string(),
            DecisionRule::ModerateRisk => "Moderate risk requires underwriter review".to_string(),
            DecisionRule::HighRisk => {
                "High risk profile exceeds acceptable threshold".to_string()
            }
        }
    }
}

/// Verdict plus the additive (0-1) score it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionKind,
    pub reason: String,
    pub risk_score: f64,
    pub rule: DecisionRule,
    pub components: Vec<ScoreComponent>,
}

impl Decision {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} (risk {:.2})",
            self.decision.label(),
            self.reason,
            self.risk_score
        )
    }
}

/// Stateless first-match-wins rule chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn decide(&self, assessment: &Assessment, reference_year: i32) -> Decision {
        let risk_score = additive_risk_score(assessment, reference_year);
        let components = additive_breakdown(assessment, reference_year);
        debug!(
            assessment_id = %assessment.id,
            risk_score,
            ?components,
            "additive risk breakdown"
        );

        let rule = select_rule(assessment, risk_score);

        Decision {
            decision: rule.kind(),
            reason: rule.reason(),
            risk_score,
            rule,
            components,
        }
    }
}

fn select_rule(assessment: &Assessment, risk_score: f64) -> DecisionRule {
    let driver = &assessment.driver;
    let coverage = &assessment.coverage;
    let minimum = coverage.coverage_type.limits().minimum;

    if driver.previous_accidents > MAX_PREVIOUS_ACCIDENTS {
        DecisionRule::ExcessiveAccidents {
            count: driver.previous_accidents,
        }
    } else if driver.age < MINIMUM_DRIVER_AGE {
        DecisionRule::UnderAge { age: driver.age }
    } else if coverage.amount < minimum {
        DecisionRule::InsufficientCoverage {
            coverage_type: coverage.coverage_type,
            minimum,
            actual: coverage.amount,
        }
    } else if risk_score <= APPROVE_THRESHOLD {
        DecisionRule::LowRisk
    } else if risk_score <= REVIEW_THRESHOLD {
        DecisionRule::ModerateRisk
    } else {
        DecisionRule::HighRisk
    }
}

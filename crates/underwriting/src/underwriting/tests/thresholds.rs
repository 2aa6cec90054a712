use super::common::*;
use chrono::Duration;

use crate::underwriting::decision::{
    ApproverRole, EscalationCondition, EscalationRule, ThresholdBook, ThresholdDraft,
    ThresholdError,
};
use crate::underwriting::permissions::{RolePermissions, UserRole};

fn requirement_ids(book: &ThresholdBook, value: f64, score: f64, claims: u32) -> Vec<String> {
    book.check_approval_requirements(value, score, claims)
        .into_iter()
        .map(|requirement| requirement.id)
        .collect()
}

fn manager_draft(rules: Vec<EscalationRule>) -> ThresholdDraft {
    ThresholdDraft {
        role: ApproverRole::Manager,
        max_policy_value: 1_000_000.0,
        max_risk_score: 80.0,
        requires_escalation: true,
        escalation_rules: rules,
    }
}

#[test]
fn standard_book_seeds_three_tiers() {
    let book = ThresholdBook::standard(now());

    assert_eq!(book.thresholds().len(), 3);
    assert_eq!(book.requirements().len(), 4);
    let senior = book
        .threshold_for(ApproverRole::SeniorUnderwriter)
        .expect("senior tier present");
    assert_eq!(senior.max_policy_value, 500_000.0);
    assert_eq!(senior.max_risk_score, 60.0);
    assert!(book
        .threshold_for(ApproverRole::Manager)
        .is_some_and(|threshold| threshold.requires_escalation));
}

#[test]
fn special_coverage_requirement_always_applies() {
    let book = ThresholdBook::standard(now());

    assert_eq!(requirement_ids(&book, 100_000.0, 10.0, 0), vec!["req-4"]);
    assert_eq!(
        book.required_role(100_000.0, 10.0, 0),
        Some(ApproverRole::SeniorUnderwriter)
    );
}

#[test]
fn requirement_thresholds_are_strict() {
    let book = ThresholdBook::standard(now());

    assert_eq!(requirement_ids(&book, 250_000.0, 60.0, 2), vec!["req-4"]);
    assert_eq!(
        requirement_ids(&book, 250_001.0, 61.0, 3),
        vec!["req-1", "req-2", "req-3", "req-4"]
    );
    assert_eq!(
        book.required_role(250_001.0, 61.0, 3),
        Some(ApproverRole::Manager)
    );
}

#[test]
fn can_finalize_checks_permission_and_caps() {
    let book = ThresholdBook::standard(now());
    let permissions = RolePermissions;

    assert!(book.can_finalize(
        ApproverRole::Underwriter,
        UserRole::Underwriter,
        &permissions,
        250_000.0,
        40.0
    ));
    assert!(!book.can_finalize(
        ApproverRole::Underwriter,
        UserRole::Underwriter,
        &permissions,
        250_000.5,
        40.0
    ));
    assert!(!book.can_finalize(
        ApproverRole::Underwriter,
        UserRole::Underwriter,
        &permissions,
        200_000.0,
        41.0
    ));
    assert!(!book.can_finalize(
        ApproverRole::Manager,
        UserRole::Viewer,
        &permissions,
        10_000.0,
        5.0
    ));
}

#[test]
fn approval_check_blocks_approver_below_required_role() {
    let book = ThresholdBook::standard(now());

    let check = book.approval_check(
        ApproverRole::Underwriter,
        UserRole::Underwriter,
        &RolePermissions,
        200_000.0,
        30.0,
        0,
    );

    assert!(!check.can_finalize);
    assert_eq!(check.required_role, Some(ApproverRole::SeniorUnderwriter));
    assert_eq!(check.blockers, vec!["requires senior_underwriter sign-off"]);
}

#[test]
fn senior_underwriter_finalizes_within_caps() {
    let book = ThresholdBook::standard(now());

    let check = book.approval_check(
        ApproverRole::SeniorUnderwriter,
        UserRole::Underwriter,
        &RolePermissions,
        400_000.0,
        50.0,
        1,
    );

    assert!(check.can_finalize, "blockers: {:?}", check.blockers);
    assert_eq!(check.requirements.len(), 2);
    assert!(check.escalations.is_empty());
}

#[test]
fn approval_check_collects_every_blocker() {
    let book = ThresholdBook::standard(now());

    let check = book.approval_check(
        ApproverRole::SeniorUnderwriter,
        UserRole::Viewer,
        &RolePermissions,
        600_000.0,
        70.0,
        3,
    );

    assert!(!check.can_finalize);
    assert_eq!(check.blockers.len(), 4);
    assert!(check.blockers[0].contains("lacks approve permission"));
    assert_eq!(check.blockers[1], "policy value exceeds senior_underwriter cap");
    assert_eq!(check.blockers[2], "risk score exceeds senior_underwriter cap");
    assert_eq!(check.blockers[3], "requires manager sign-off");
}

#[test]
fn auto_escalation_rules_block_finalization() {
    let mut book = ThresholdBook::standard(now());
    let rule = EscalationRule {
        id: "esc-1".to_string(),
        condition: EscalationCondition::Value,
        threshold: 900_000.0,
        escalate_to: ApproverRole::Manager,
        auto_escalate: true,
        notify_users: vec!["head-of-motor".to_string()],
    };
    book.update_threshold("th-3", manager_draft(vec![rule]), now())
        .expect("th-3 exists");

    let check = book.approval_check(
        ApproverRole::Manager,
        UserRole::Manager,
        &RolePermissions,
        950_000.0,
        50.0,
        0,
    );
    assert_eq!(check.escalations.len(), 1);
    assert_eq!(check.blockers, vec!["escalation rule esc-1 routes to manager"]);

    let below = book.approval_check(
        ApproverRole::Manager,
        UserRole::Manager,
        &RolePermissions,
        850_000.0,
        50.0,
        0,
    );
    assert!(below.can_finalize);
}

#[test]
fn advisory_escalation_rules_are_reported_without_blocking() {
    let mut book = ThresholdBook::standard(now());
    let rule = EscalationRule {
        id: "esc-2".to_string(),
        condition: EscalationCondition::Claims,
        threshold: 0.0,
        escalate_to: ApproverRole::Manager,
        auto_escalate: false,
        notify_users: Vec::new(),
    };
    book.update_threshold("th-3", manager_draft(vec![rule]), now())
        .expect("th-3 exists");

    let escalations = book.triggered_escalations(ApproverRole::Manager, 10_000.0, 10.0, 1);
    assert_eq!(escalations.len(), 1);
    assert!(book
        .approval_check(
            ApproverRole::Manager,
            UserRole::Manager,
            &RolePermissions,
            10_000.0,
            10.0,
            1
        )
        .can_finalize);
}

#[test]
fn add_threshold_assigns_sequential_ids() {
    let mut book = ThresholdBook::standard(now());

    let added = book
        .add_threshold(
            ThresholdDraft {
                role: ApproverRole::Underwriter,
                max_policy_value: 150_000.0,
                max_risk_score: 30.0,
                requires_escalation: false,
                escalation_rules: Vec::new(),
            },
            now(),
        )
        .expect("valid draft");
    assert_eq!(added.id, "th-4");
    assert_eq!(book.thresholds().len(), 4);
}

#[test]
fn invalid_drafts_are_rejected() {
    let mut book = ThresholdBook::standard(now());
    let mut draft = manager_draft(Vec::new());

    draft.max_policy_value = -1.0;
    match book.add_threshold(draft.clone(), now()) {
        Err(ThresholdError::Invalid { field, .. }) => assert_eq!(field, "max_policy_value"),
        other => panic!("expected invalid value, got {other:?}"),
    }

    draft.max_policy_value = 1_000.0;
    draft.max_risk_score = 101.0;
    match book.add_threshold(draft, now()) {
        Err(ThresholdError::Invalid { field, message }) => {
            assert_eq!(field, "max_risk_score");
            assert_eq!(message, "Maximum score is 100");
        }
        other => panic!("expected invalid score, got {other:?}"),
    }
    assert_eq!(book.thresholds().len(), 3);
}

#[test]
fn update_never_moves_updated_at_behind_created_at() {
    let mut book = ThresholdBook::standard(now());

    book.update_threshold("th-1", manager_draft(Vec::new()), now() - Duration::days(1))
        .expect("th-1 exists");
    let updated = &book.thresholds()[0];
    assert_eq!(updated.updated_at, updated.created_at);

    book.update_threshold("th-1", manager_draft(Vec::new()), now() + Duration::hours(2))
        .expect("th-1 exists");
    assert_eq!(book.thresholds()[0].updated_at, now() + Duration::hours(2));
}

#[test]
fn unknown_threshold_ids_are_reported() {
    let mut book = ThresholdBook::standard(now());

    assert!(matches!(
        book.update_threshold("th-9", manager_draft(Vec::new()), now()),
        Err(ThresholdError::NotFound(id)) if id == "th-9"
    ));
    assert!(matches!(
        book.delete_threshold("th-9"),
        Err(ThresholdError::NotFound(_))
    ));
}

#[test]
fn deleting_a_tier_removes_its_authority() {
    let mut book = ThresholdBook::standard(now());

    let removed = book.delete_threshold("th-1").expect("th-1 exists");
    assert_eq!(removed.role, ApproverRole::Underwriter);
    assert!(book.threshold_for(ApproverRole::Underwriter).is_none());
    assert!(!book.can_finalize(
        ApproverRole::Underwriter,
        UserRole::Underwriter,
        &RolePermissions,
        1_000.0,
        1.0
    ));
}

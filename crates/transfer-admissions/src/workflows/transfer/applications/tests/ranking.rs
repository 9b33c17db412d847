use super::common::*;

use crate::workflows::transfer::applications::domain::{
    Application, ApplicationId, CohortKey, Evaluation, EvaluationId, RankingOutcome,
    VerifiedCredentials,
};
use crate::workflows::transfer::applications::evaluation::{EvaluationConfig, EvaluationEngine};
use crate::workflows::transfer::applications::ranking::rank_cohort;
use crate::workflows::transfer::applications::repository::CohortEntry;
use crate::workflows::transfer::applications::ApplicationStatus;

fn cohort() -> CohortKey {
    CohortKey::new(COMPUTER_ENGINEERING, ENGINEERING, period())
}

fn entry(number: &str, minutes: i64, credentials: VerifiedCredentials) -> CohortEntry {
    let submission = engineering_submission(number, minutes);
    let application = Application {
        id: ApplicationId(format!("app-{number}")),
        application_number: submission.application_number,
        applicant_id: submission.applicant_id,
        target_faculty: submission.target_faculty,
        target_department: submission.target_department,
        period: submission.period,
        declared: submission.declared,
        status: ApplicationStatus::YgkEvaluation,
        rejection_reason: None,
        submitted_at: submitted_at(minutes),
    };
    let findings = EvaluationEngine::new(EvaluationConfig::default())
        .assess(&application, &credentials, &[], 460.0)
        .expect("assessment succeeds");
    let evaluation = Evaluation {
        id: EvaluationId(format!("eval-{number}")),
        application_id: application.id.clone(),
        evaluator_id: evaluator(),
        started_at: submitted_at(minutes),
        findings: Some(findings),
        evaluator_notes: None,
        completed_at: Some(submitted_at(minutes + 60)),
    };
    CohortEntry {
        application,
        evaluation,
    }
}

fn five_eligible() -> Vec<CohortEntry> {
    vec![
        entry("CE-004", 3, verified(3.00, 410.0, 90_000)),
        entry("CE-001", 0, verified(3.60, 440.0, 10_000)),
        entry("CE-005", 4, verified(2.80, 400.0, 95_000)),
        entry("CE-003", 2, verified(3.20, 420.0, 50_000)),
        entry("CE-002", 1, verified(3.40, 430.0, 30_000)),
    ]
}

#[test]
fn quota_splits_primary_and_waitlist() {
    let run = rank_cohort(&cohort(), 3, five_eligible(), submitted_at(600)).expect("run succeeds");

    assert_eq!(
        numbers_in_rank_order(&run.rankings),
        vec![
            (1, "CE-001".to_string()),
            (2, "CE-002".to_string()),
            (3, "CE-003".to_string()),
            (4, "CE-004".to_string()),
            (5, "CE-005".to_string()),
        ]
    );
    for ranking in &run.rankings {
        assert_eq!(ranking.is_primary, ranking.rank <= 3);
        assert_eq!(ranking.is_waitlisted, ranking.rank > 3);
        assert!(!(ranking.is_primary && ranking.is_waitlisted));
        assert_eq!(ranking.quota, 3);
    }
    assert_eq!(run.counts.total_evaluated, 5);
    assert_eq!(run.counts.primary, 3);
    assert_eq!(run.counts.waitlisted, 2);
    assert_eq!(run.counts.not_eligible, 0);

    let statuses: Vec<_> = run
        .applications
        .iter()
        .map(|application| application.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Ranked,
            ApplicationStatus::Ranked,
            ApplicationStatus::Ranked,
            ApplicationStatus::Waitlisted,
            ApplicationStatus::Waitlisted,
        ]
    );
}

#[test]
fn scores_never_increase_down_the_ranking() {
    let run = rank_cohort(&cohort(), 2, five_eligible(), submitted_at(600)).expect("run succeeds");

    for pair in run.rankings.windows(2) {
        assert!(pair[0].composite_score >= pair[1].composite_score);
        assert_eq!(pair[1].rank, pair[0].rank + 1);
    }
}

#[test]
fn ineligible_rows_get_rank_zero_and_a_rejection_reason() {
    let mut entries = five_eligible();
    entries.push(entry("CE-006", 5, verified(3.90, 450.0, 300_001)));

    let run = rank_cohort(&cohort(), 3, entries, submitted_at(600)).expect("run succeeds");

    let row = run
        .rankings
        .iter()
        .find(|ranking| ranking.application_number == "CE-006")
        .expect("row for ineligible applicant");
    assert_eq!(row.rank, 0);
    assert!(!row.is_primary);
    assert!(!row.is_waitlisted);
    assert_eq!(row.composite_score, 0.0);
    assert_eq!(row.outcome(), RankingOutcome::NotEligible);
    assert_eq!(run.rankings.last(), Some(row));

    let application = run
        .applications
        .iter()
        .find(|application| application.application_number == "CE-006")
        .expect("application returned");
    assert_eq!(application.status, ApplicationStatus::Rejected);
    assert!(application
        .rejection_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("exam rank 300001")));

    let notice = run
        .notifications
        .iter()
        .find(|notification| notification.application_number == "CE-006")
        .expect("notification queued");
    assert_eq!(notice.status, RankingOutcome::NotEligible);
    assert_eq!(notice.rank, None);
    assert_eq!(notice.total_applicants, Some(6));
    assert!(notice.reason.is_some());
    assert_eq!(run.counts.not_eligible, 1);
}

#[test]
fn equal_scores_favor_the_earlier_submission() {
    let entries = vec![
        entry("CE-B", 5, verified(3.20, 420.0, 50_000)),
        entry("CE-A", 9, verified(3.20, 420.0, 50_000)),
        entry("CE-C", 5, verified(3.20, 420.0, 50_000)),
    ];

    let run = rank_cohort(&cohort(), 1, entries, submitted_at(600)).expect("run succeeds");

    assert_eq!(
        numbers_in_rank_order(&run.rankings),
        vec![
            (1, "CE-B".to_string()),
            (2, "CE-C".to_string()),
            (3, "CE-A".to_string()),
        ]
    );
}

#[test]
fn rerun_over_reordered_input_reproduces_assignments() {
    let first = rank_cohort(&cohort(), 3, five_eligible(), submitted_at(600)).expect("first run");
    let mut reversed = five_eligible();
    reversed.reverse();
    let second = rank_cohort(&cohort(), 3, reversed, submitted_at(700)).expect("second run");

    assert_eq!(
        numbers_in_rank_order(&first.rankings),
        numbers_in_rank_order(&second.rankings)
    );
    let ids = |run: &crate::workflows::transfer::applications::RankingRun| {
        run.rankings
            .iter()
            .map(|ranking| ranking.id.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn entries_outside_the_cohort_or_unfinished_are_ignored() {
    let mut entries = five_eligible();
    let mut unfinished = entry("CE-007", 6, verified(3.90, 450.0, 1_000));
    unfinished.evaluation.completed_at = None;
    entries.push(unfinished);
    let mut elsewhere = entry("CE-008", 7, verified(3.90, 450.0, 1_000));
    elsewhere.application.target_department = "Electrical Engineering".to_string();
    entries.push(elsewhere);
    let mut withdrawn = entry("CE-009", 8, verified(3.90, 450.0, 1_000));
    withdrawn.application.status = ApplicationStatus::Rejected;
    entries.push(withdrawn);

    let run = rank_cohort(&cohort(), 3, entries, submitted_at(600)).expect("run succeeds");

    assert_eq!(run.counts.total_evaluated, 5);
    assert!(run
        .rankings
        .iter()
        .all(|ranking| {
            !["CE-007", "CE-008", "CE-009"].contains(&ranking.application_number.as_str())
        }));
}

#[test]
fn empty_cohort_produces_an_empty_run() {
    let run = rank_cohort(&cohort(), 3, Vec::new(), submitted_at(600)).expect("run succeeds");

    assert!(run.rankings.is_empty());
    assert!(run.notifications.is_empty());
    assert_eq!(run.counts.total_evaluated, 0);
}

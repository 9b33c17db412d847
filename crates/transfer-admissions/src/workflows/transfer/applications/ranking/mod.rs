//! Cohort ranking: sort eligible applicants by merit, split them at the quota and mark the
//! rest as not eligible.
//!
//! Nothing here touches storage. A run returns the ranking rows, the applications with their
//! new statuses and the notifications to send; the service decides how to persist and deliver
//! them.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Application, CohortKey, Ranking, RankingId, RankingOutcome};
use super::repository::{CohortEntry, TransferNotification};
use super::status::{ApplicationStatus, TransitionError};

const FALLBACK_REJECTION_REASON: &str = "transfer eligibility criteria not met";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RankingCounts {
    pub total_evaluated: usize,
    pub primary: usize,
    pub waitlisted: usize,
    pub not_eligible: usize,
}

/// Everything a ranking run decided, before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRun {
    pub cohort: CohortKey,
    pub quota: u32,
    /// Eligible rows in rank order followed by the unranked rows.
    pub rankings: Vec<Ranking>,
    pub applications: Vec<Application>,
    pub notifications: Vec<TransferNotification>,
    pub counts: RankingCounts,
}

/// Rank every completed evaluation of `cohort` against `quota` seats.
///
/// Equal scores go to the earlier submission, then to the lower application number, so a rerun
/// over unchanged evaluations reproduces the same order. Entries for other cohorts or with
/// unfinished evaluations are ignored, as are applications staff already moved past the ranking
/// stage.
pub fn rank_cohort(
    cohort: &CohortKey,
    quota: u32,
    entries: Vec<CohortEntry>,
    generated_at: DateTime<Utc>,
) -> Result<RankingRun, TransitionError> {
    let (mut eligible, mut ineligible): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .filter(|entry| {
            entry.evaluation.is_completed()
                && entry.application.cohort_key() == *cohort
                && is_rankable(entry)
        })
        .partition(|entry| entry.evaluation.overall_eligible());

    eligible.sort_by(merit_order);
    ineligible.sort_by(|a, b| {
        a.application
            .application_number
            .cmp(&b.application.application_number)
    });

    let total_evaluated = eligible.len() + ineligible.len();
    let mut run = RankingRun {
        cohort: cohort.clone(),
        quota,
        rankings: Vec::with_capacity(total_evaluated),
        applications: Vec::with_capacity(total_evaluated),
        notifications: Vec::with_capacity(total_evaluated),
        counts: RankingCounts {
            total_evaluated,
            ..RankingCounts::default()
        },
    };

    for (rank, entry) in (1u32..).zip(eligible) {
        let CohortEntry {
            mut application,
            evaluation,
        } = entry;
        let is_primary = rank <= quota;
        let (status, outcome) = if is_primary {
            run.counts.primary += 1;
            (ApplicationStatus::Ranked, RankingOutcome::Primary)
        } else {
            run.counts.waitlisted += 1;
            (ApplicationStatus::Waitlisted, RankingOutcome::Waitlisted)
        };
        application.transition(status, None)?;

        let score = evaluation.composite_score();
        run.rankings.push(Ranking {
            id: ranking_id(&application),
            application_id: application.id.clone(),
            application_number: application.application_number.clone(),
            department: cohort.department.clone(),
            faculty: cohort.faculty.clone(),
            period: cohort.period.clone(),
            rank,
            composite_score: score,
            is_primary,
            is_waitlisted: !is_primary,
            quota,
            is_published: false,
            published_at: None,
            generated_at,
        });
        run.notifications.push(TransferNotification {
            applicant_id: application.applicant_id.clone(),
            application_number: application.application_number.clone(),
            department: cohort.department.clone(),
            status: outcome,
            rank: Some(rank),
            quota: Some(quota),
            total_applicants: Some(total_evaluated),
            score: Some(score),
            reason: None,
        });
        run.applications.push(application);
    }

    for entry in ineligible {
        let CohortEntry {
            mut application,
            evaluation,
        } = entry;
        let reason = match evaluation.eligibility_notes().trim() {
            "" => FALLBACK_REJECTION_REASON.to_string(),
            notes => notes.to_string(),
        };
        application.transition(ApplicationStatus::Rejected, Some(reason.clone()))?;
        run.counts.not_eligible += 1;

        run.rankings.push(Ranking {
            id: ranking_id(&application),
            application_id: application.id.clone(),
            application_number: application.application_number.clone(),
            department: cohort.department.clone(),
            faculty: cohort.faculty.clone(),
            period: cohort.period.clone(),
            rank: 0,
            composite_score: evaluation.composite_score(),
            is_primary: false,
            is_waitlisted: false,
            quota,
            is_published: false,
            published_at: None,
            generated_at,
        });
        run.notifications.push(TransferNotification {
            applicant_id: application.applicant_id.clone(),
            application_number: application.application_number.clone(),
            department: cohort.department.clone(),
            status: RankingOutcome::NotEligible,
            rank: None,
            quota: Some(quota),
            total_applicants: Some(total_evaluated),
            score: None,
            reason: Some(reason),
        });
        run.applications.push(application);
    }

    Ok(run)
}

fn is_rankable(entry: &CohortEntry) -> bool {
    let status = entry.application.status;
    if entry.evaluation.overall_eligible() {
        status.accepts_evaluation()
    } else {
        status.can_transition_to(ApplicationStatus::Rejected)
    }
}

fn merit_order(a: &CohortEntry, b: &CohortEntry) -> Ordering {
    b.evaluation
        .composite_score()
        .total_cmp(&a.evaluation.composite_score())
        .then_with(|| a.application.submitted_at.cmp(&b.application.submitted_at))
        .then_with(|| {
            a.application
                .application_number
                .cmp(&b.application.application_number)
        })
}

// One row per application and cohort, so the id is stable across reruns.
fn ranking_id(application: &Application) -> RankingId {
    RankingId(format!("rnk-{}", application.id.0))
}

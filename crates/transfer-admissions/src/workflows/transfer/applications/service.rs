use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationPeriod, CohortKey, DepartmentPeriod, Evaluation,
    EvaluationId, EvaluatorId, NewApplication, Ranking, RankingOutcome, VerifiedCredentials,
};
use super::evaluation::{EvaluationConfig, EvaluationEngine, EvaluationError};
use super::ranking::{rank_cohort, RankingCounts};
use super::repository::{
    NotificationPublisher, RankingWrite, ReferenceCatalog, RepositoryError, TransferNotification,
    TransferRepository, WriteBatch,
};
use super::status::{ApplicationStatus, TransitionError};

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

/// One mutex per (department, period); held across read, compute and write of a ranking.
#[derive(Default)]
struct RankingLocks {
    locks: Mutex<HashMap<DepartmentPeriod, Arc<Mutex<()>>>>,
}

impl RankingLocks {
    fn for_board(&self, board: &DepartmentPeriod) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(board.clone()).or_default().clone()
    }
}

/// Outcome of one ranking run as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct RankingRunSummary {
    pub cohort: CohortKey,
    pub quota: u32,
    #[serde(flatten)]
    pub counts: RankingCounts,
    pub rankings: Vec<Ranking>,
    /// Notifications the publisher refused; the ranking itself is already stored.
    pub undelivered_notifications: usize,
}

/// Service composing the repository, reference catalog, notifier and evaluation engine.
pub struct TransferApplicationService<R, C, N> {
    repository: Arc<R>,
    catalog: Arc<C>,
    notifier: Arc<N>,
    engine: Arc<EvaluationEngine>,
    ranking_locks: RankingLocks,
}

impl<R, C, N> TransferApplicationService<R, C, N>
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<C>,
        notifier: Arc<N>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            notifier,
            engine: Arc::new(EvaluationEngine::new(config)),
            ranking_locks: RankingLocks::default(),
        }
    }

    /// Record a new application in `SUBMITTED`.
    pub fn register_application(
        &self,
        submission: NewApplication,
    ) -> Result<Application, TransferServiceError> {
        let application = Application {
            id: next_application_id(),
            application_number: submission.application_number,
            applicant_id: submission.applicant_id,
            target_faculty: submission.target_faculty,
            target_department: submission.target_department,
            period: submission.period,
            declared: submission.declared,
            status: ApplicationStatus::Submitted,
            rejection_reason: None,
            submitted_at: submission.submitted_at.unwrap_or_else(Utc::now),
        };

        let stored = self.repository.insert_application(application)?;
        debug!(
            application_id = %stored.id.0,
            number = %stored.application_number,
            "application registered"
        );
        Ok(stored)
    }

    /// Apply a staff-owned status change (review, routing, board decisions).
    pub fn route_application(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
        reason: Option<String>,
    ) -> Result<Application, TransferServiceError> {
        if status.is_ranking_outcome() {
            return Err(TransferServiceError::RankingOwnedStatus(status.label()));
        }

        let lock = self.board_lock(application_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut application = self.application(application_id)?;
        if status == ApplicationStatus::FacultyBoard && !self.is_published(&application)? {
            return Err(TransferServiceError::RankingNotPublished {
                department: application.target_department.clone(),
                period: application.period.to_string(),
            });
        }
        application.transition(status, reason)?;
        self.repository
            .commit(WriteBatch::new().save_application(application.clone()))?;

        info!(application_id = %application.id.0, status = status.label(), "application routed");
        Ok(application)
    }

    pub fn get_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, TransferServiceError> {
        self.application(application_id)
    }

    /// Return the application's evaluation, opening one (and entering `YGK_EVALUATION`) if
    /// none exists yet.
    pub fn begin_or_resume_evaluation(
        &self,
        application_id: &ApplicationId,
        evaluator_id: &EvaluatorId,
    ) -> Result<Evaluation, TransferServiceError> {
        let lock = self.board_lock(application_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut application = self.application(application_id)?;

        if let Some(existing) = self.repository.evaluation_for(application_id)? {
            debug!(evaluation_id = %existing.id.0, "resuming evaluation");
            return Ok(existing);
        }

        application.transition(ApplicationStatus::YgkEvaluation, None)?;
        let evaluation = Evaluation {
            id: next_evaluation_id(),
            application_id: application.id.clone(),
            evaluator_id: evaluator_id.clone(),
            started_at: Utc::now(),
            findings: None,
            evaluator_notes: None,
            completed_at: None,
        };

        self.repository.commit(
            WriteBatch::new()
                .save_application(application)
                .save_evaluation(evaluation.clone()),
        )?;

        info!(
            evaluation_id = %evaluation.id.0,
            application_id = %evaluation.application_id.0,
            evaluator = %evaluator_id.0,
            "evaluation opened"
        );
        Ok(evaluation)
    }

    /// Score verified credentials and complete the evaluation.
    ///
    /// An ineligible verdict rejects the application in the same write and notifies the
    /// applicant; an eligible one leaves the application waiting for a ranking run.
    pub fn evaluate(
        &self,
        evaluation_id: &EvaluationId,
        evaluator_id: &EvaluatorId,
        verified: VerifiedCredentials,
    ) -> Result<Evaluation, TransferServiceError> {
        let missing =
            || TransferServiceError::NotFound(MissingRecord::Evaluation(evaluation_id.clone()));
        let application_id = self
            .repository
            .fetch_evaluation(evaluation_id)?
            .ok_or_else(missing)?
            .application_id;

        // Held until the commit so a ranking run never sees half of this write.
        let lock = self.board_lock(&application_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut evaluation = self
            .repository
            .fetch_evaluation(evaluation_id)?
            .ok_or_else(missing)?;
        let mut application = self.application(&evaluation.application_id)?;

        if !application.status.accepts_evaluation() || self.is_published(&application)? {
            return Err(TransferServiceError::EvaluationClosed {
                application_id: application.id.0.clone(),
                status: application.status.label(),
            });
        }

        let requirements = self
            .catalog
            .department_requirements(&application.target_department, &application.target_faculty)?;
        let base_score = self
            .catalog
            .program_base_score(
                &application.target_department,
                &application.target_faculty,
                verified.exam_year,
            )?
            .ok_or_else(|| {
                TransferServiceError::NotFound(MissingRecord::ProgramBaseScore {
                    department: application.target_department.clone(),
                    faculty: application.target_faculty.clone(),
                    year: verified.exam_year,
                })
            })?;

        let findings =
            self.engine
                .assess(&application, &verified, &requirements, base_score.base_score)?;
        let eligible = findings.eligibility.overall_eligible();

        if !eligible {
            application.transition(
                ApplicationStatus::Rejected,
                Some(findings.eligibility_notes.clone()),
            )?;
        }

        evaluation.evaluator_id = evaluator_id.clone();
        evaluation.evaluator_notes = verified.evaluator_notes;
        evaluation.findings = Some(findings);
        evaluation.completed_at = Some(Utc::now());

        self.repository.commit(
            WriteBatch::new()
                .save_application(application.clone())
                .save_evaluation(evaluation.clone()),
        )?;

        info!(
            evaluation_id = %evaluation.id.0,
            application_id = %application.id.0,
            eligible,
            score = evaluation.composite_score(),
            "evaluation completed"
        );

        if !eligible {
            self.dispatch(TransferNotification {
                applicant_id: application.applicant_id.clone(),
                application_number: application.application_number.clone(),
                department: application.target_department.clone(),
                status: RankingOutcome::NotEligible,
                rank: None,
                quota: None,
                total_applicants: None,
                score: None,
                reason: application.rejection_reason.clone(),
            });
        }

        Ok(evaluation)
    }

    /// Rebuild the ranking of one cohort from its completed evaluations.
    pub fn generate_rankings(
        &self,
        department: &str,
        faculty: &str,
        period: &ApplicationPeriod,
    ) -> Result<RankingRunSummary, TransferServiceError> {
        let cohort = CohortKey::new(department, faculty, period.clone());
        let board = cohort.board();
        let lock = self.ranking_locks.for_board(&board);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let quota = self
            .catalog
            .quota(department, faculty, period.academic_year(), period.semester())?
            .ok_or_else(|| TransferServiceError::MissingQuota {
                department: department.to_string(),
                faculty: faculty.to_string(),
                period: period.to_string(),
            })?;

        if self
            .repository
            .rankings(department, period)?
            .iter()
            .any(|ranking| ranking.is_published)
        {
            return Err(TransferServiceError::RankingAlreadyPublished {
                department: department.to_string(),
                period: period.to_string(),
            });
        }

        let entries = self.repository.completed_evaluations(&cohort)?;
        let run = rank_cohort(&cohort, quota.seats, entries, Utc::now())?;

        let mut batch = WriteBatch::new().rankings(RankingWrite::Replace {
            cohort: cohort.clone(),
            rankings: run.rankings.clone(),
        });
        batch.applications = run.applications;
        self.repository.commit(batch)?;

        let undelivered_notifications = run
            .notifications
            .into_iter()
            .filter(|notification| !self.dispatch(notification.clone()))
            .count();

        info!(
            department,
            faculty,
            period = %period,
            quota = quota.seats,
            total = run.counts.total_evaluated,
            primary = run.counts.primary,
            waitlisted = run.counts.waitlisted,
            not_eligible = run.counts.not_eligible,
            "rankings generated"
        );

        Ok(RankingRunSummary {
            cohort,
            quota: quota.seats,
            counts: run.counts,
            rankings: run.rankings,
            undelivered_notifications,
        })
    }

    /// Rankings of every faculty cohort for the department, rank order with unranked last.
    pub fn get_rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, TransferServiceError> {
        Ok(self.repository.rankings(department, period)?)
    }

    /// Publish the department's rankings. Repeat calls keep the first publish timestamp.
    pub fn publish_rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, TransferServiceError> {
        let board = DepartmentPeriod {
            department: department.to_string(),
            period: period.clone(),
        };
        let lock = self.ranking_locks.for_board(&board);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut rankings = self.repository.rankings(department, period)?;
        if rankings.is_empty() {
            return Err(TransferServiceError::NotFound(MissingRecord::Rankings(board)));
        }

        let now = Utc::now();
        for ranking in &mut rankings {
            ranking.publish(now);
        }
        self.repository
            .commit(WriteBatch::new().rankings(RankingWrite::Update(rankings.clone())))?;

        info!(department, period = %period, rows = rankings.len(), "rankings published");
        Ok(rankings)
    }

    fn application(&self, id: &ApplicationId) -> Result<Application, TransferServiceError> {
        self.repository
            .fetch_application(id)?
            .ok_or_else(|| TransferServiceError::NotFound(MissingRecord::Application(id.clone())))
    }

    // Department and period never change after intake, so the board can be read unlocked.
    fn board_lock(&self, id: &ApplicationId) -> Result<Arc<Mutex<()>>, TransferServiceError> {
        let board = self.application(id)?.cohort_key().board();
        Ok(self.ranking_locks.for_board(&board))
    }

    fn is_published(&self, application: &Application) -> Result<bool, TransferServiceError> {
        Ok(self
            .repository
            .rankings(&application.target_department, &application.period)?
            .iter()
            .any(|ranking| ranking.is_published))
    }

    // Delivery failures are logged and counted, never rolled back into the stored outcome.
    fn dispatch(&self, notification: TransferNotification) -> bool {
        let number = notification.application_number.clone();
        match self.notifier.publish(notification) {
            Ok(()) => true,
            Err(err) => {
                warn!(application_number = %number, error = %err, "notification not delivered");
                false
            }
        }
    }
}

/// Record a lookup expected but did not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingRecord {
    Application(ApplicationId),
    Evaluation(EvaluationId),
    ProgramBaseScore {
        department: String,
        faculty: String,
        year: i32,
    },
    Rankings(DepartmentPeriod),
}

impl fmt::Display for MissingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingRecord::Application(id) => write!(f, "application {}", id.0),
            MissingRecord::Evaluation(id) => write!(f, "evaluation {}", id.0),
            MissingRecord::ProgramBaseScore {
                department,
                faculty,
                year,
            } => write!(f, "program base score for {department} / {faculty} ({year})"),
            MissingRecord::Rankings(board) => {
                write!(f, "rankings for {} in {}", board.department, board.period)
            }
        }
    }
}

/// Error raised by the transfer application service.
#[derive(Debug, thiserror::Error)]
pub enum TransferServiceError {
    #[error("{0} not found")]
    NotFound(MissingRecord),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("no quota configured for {department} / {faculty} in {period}")]
    MissingQuota {
        department: String,
        faculty: String,
        period: String,
    },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("application {application_id} is {status} and cannot be evaluated")]
    EvaluationClosed {
        application_id: String,
        status: &'static str,
    },
    #[error("rankings for {department} in {period} are already published")]
    RankingAlreadyPublished { department: String, period: String },
    #[error("rankings for {department} in {period} must be published before board review")]
    RankingNotPublished { department: String, period: String },
    #[error("status {0} is only assigned by ranking runs")]
    RankingOwnedStatus(&'static str),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

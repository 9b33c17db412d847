use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::transfer::applications::domain::{
    ApplicantId, Application, ApplicationId, ApplicationPeriod, CohortKey, DeclaredCredentials,
    DepartmentRequirement, Evaluation, EvaluationId, EvaluatorId, LetterGrade, NewApplication,
    ProgramBaseScore, Quota, Ranking, RequirementKind, Semester, VerifiedCredentials,
};
use crate::workflows::transfer::applications::memory::{
    InMemoryReferenceCatalog, InMemoryTransferRepository, RecordingNotifier,
};
use crate::workflows::transfer::applications::repository::{
    CohortEntry, NotificationError, NotificationPublisher, RepositoryError, TransferNotification,
    TransferRepository, WriteBatch,
};
use crate::workflows::transfer::applications::{
    transfer_router, ApplicationStatus, EvaluationConfig, TransferApplicationService,
};

pub(super) const ENGINEERING: &str = "Faculty of Engineering";
pub(super) const COMPUTER_ENGINEERING: &str = "Computer Engineering";
pub(super) const ARCHITECTURE_FACULTY: &str = "Faculty of Architecture";
pub(super) const ARCHITECTURE: &str = "Architecture";
pub(super) const EXAM_YEAR: i32 = 2024;

pub(super) type MemoryService = TransferApplicationService<
    InMemoryTransferRepository,
    InMemoryReferenceCatalog,
    RecordingNotifier,
>;

pub(super) fn period() -> ApplicationPeriod {
    ApplicationPeriod::new("2024-2025", Semester::Fall).expect("valid period")
}

pub(super) fn evaluator() -> EvaluatorId {
    EvaluatorId("ygk-01".to_string())
}

pub(super) fn submitted_at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).single().expect("valid timestamp")
        + Duration::minutes(minutes)
}

pub(super) fn catalog() -> InMemoryReferenceCatalog {
    InMemoryReferenceCatalog::default()
        .with_base_score(ProgramBaseScore {
            department: COMPUTER_ENGINEERING.to_string(),
            faculty: ENGINEERING.to_string(),
            year: EXAM_YEAR,
            base_score: 460.0,
        })
        .with_base_score(ProgramBaseScore {
            department: ARCHITECTURE.to_string(),
            faculty: ARCHITECTURE_FACULTY.to_string(),
            year: EXAM_YEAR,
            base_score: 480.0,
        })
        .with_quota(Quota {
            department: COMPUTER_ENGINEERING.to_string(),
            faculty: ENGINEERING.to_string(),
            academic_year: "2024-2025".to_string(),
            semester: None,
            seats: 3,
        })
        .with_quota(Quota {
            department: ARCHITECTURE.to_string(),
            faculty: ARCHITECTURE_FACULTY.to_string(),
            academic_year: "2024-2025".to_string(),
            semester: Some(Semester::Fall),
            seats: 2,
        })
        .with_requirement(DepartmentRequirement {
            department: ARCHITECTURE.to_string(),
            faculty: ARCHITECTURE_FACULTY.to_string(),
            kind: RequirementKind::PortfolioRequired,
            active: true,
        })
}

pub(super) fn submission(number: &str, department: &str, faculty: &str) -> NewApplication {
    NewApplication {
        application_number: number.to_string(),
        applicant_id: ApplicantId(format!("stu-{number}")),
        target_faculty: faculty.to_string(),
        target_department: department.to_string(),
        period: period(),
        declared: DeclaredCredentials {
            gpa: 3.2,
            exam_score: 400.0,
            exam_rank: 120_000,
            exam_year: EXAM_YEAR,
        },
        submitted_at: Some(submitted_at(0)),
    }
}

pub(super) fn engineering_submission(number: &str, minutes: i64) -> NewApplication {
    let mut submission = submission(number, COMPUTER_ENGINEERING, ENGINEERING);
    submission.submitted_at = Some(submitted_at(minutes));
    submission
}

pub(super) fn verified(gpa: f64, exam_score: f64, exam_rank: u32) -> VerifiedCredentials {
    VerifiedCredentials {
        gpa,
        exam_score,
        exam_rank,
        exam_year: EXAM_YEAR,
        has_external_english: true,
        has_english_exemption: false,
        course_grades: None,
        has_portfolio: None,
        evaluator_notes: None,
    }
}

pub(super) fn grades(entries: &[(&str, LetterGrade)]) -> BTreeMap<String, LetterGrade> {
    entries
        .iter()
        .map(|(course, grade)| (course.to_string(), *grade))
        .collect()
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryTransferRepository>,
    Arc<RecordingNotifier>,
) {
    build_service_with(EvaluationConfig::default())
}

pub(super) fn build_service_with(
    config: EvaluationConfig,
) -> (
    MemoryService,
    Arc<InMemoryTransferRepository>,
    Arc<RecordingNotifier>,
) {
    let repository = Arc::new(InMemoryTransferRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let service = TransferApplicationService::new(
        repository.clone(),
        Arc::new(catalog()),
        notifier.clone(),
        config,
    );
    (service, repository, notifier)
}

/// Register and route an application up to the point where an evaluation can be opened.
pub(super) fn routed_application<R, C, N>(
    service: &TransferApplicationService<R, C, N>,
    submission: NewApplication,
) -> Application
where
    R: TransferRepository + 'static,
    C: crate::workflows::transfer::applications::ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    let application = service
        .register_application(submission)
        .expect("registration succeeds");
    service
        .route_application(&application.id, ApplicationStatus::FacultyRouting, None)
        .expect("faculty routing");
    service
        .route_application(&application.id, ApplicationStatus::DepartmentRouting, None)
        .expect("department routing")
}

/// Register, route, open and complete an evaluation in one go.
pub(super) fn evaluated<R, C, N>(
    service: &TransferApplicationService<R, C, N>,
    submission: NewApplication,
    credentials: VerifiedCredentials,
) -> (Application, Evaluation)
where
    R: TransferRepository + 'static,
    C: crate::workflows::transfer::applications::ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    let application = routed_application(service, submission);
    let evaluation = service
        .begin_or_resume_evaluation(&application.id, &evaluator())
        .expect("evaluation opens");
    let evaluation = service
        .evaluate(&evaluation.id, &evaluator(), credentials)
        .expect("evaluation completes");
    let application = service
        .get_application(&application.id)
        .expect("application exists");
    (application, evaluation)
}

/// Five eligible engineering applicants with distinct scores, best first by application number.
pub(super) fn seed_engineering_cohort(service: &MemoryService) -> Vec<Application> {
    [
        ("2024-CE-001", 440.0, 3.60),
        ("2024-CE-002", 430.0, 3.40),
        ("2024-CE-003", 420.0, 3.20),
        ("2024-CE-004", 410.0, 3.00),
        ("2024-CE-005", 400.0, 2.80),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (number, exam_score, gpa))| {
        evaluated(
            service,
            engineering_submission(number, index as i64),
            verified(gpa, exam_score, 100_000 + index as u32),
        )
        .0
    })
    .collect()
}

pub(super) fn numbers_in_rank_order(rankings: &[Ranking]) -> Vec<(u32, String)> {
    rankings
        .iter()
        .map(|ranking| (ranking.rank, ranking.application_number.clone()))
        .collect()
}

#[derive(Default, Clone)]
pub(super) struct FailingNotifier;

impl NotificationPublisher for FailingNotifier {
    fn publish(&self, _notification: TransferNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay offline".to_string()))
    }
}

/// Delegates to the in-memory store but refuses commits while `fail_commits` is set.
#[derive(Default, Clone)]
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryTransferRepository,
    pub(super) fail_commits: Arc<AtomicBool>,
}

impl TransferRepository for FlakyRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn fetch_evaluation(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.fetch_evaluation(id)
    }

    fn evaluation_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.evaluation_for(application_id)
    }

    fn completed_evaluations(
        &self,
        cohort: &CohortKey,
    ) -> Result<Vec<CohortEntry>, RepositoryError> {
        self.inner.completed_evaluations(cohort)
    }

    fn rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        self.inner.rankings(department, period)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("database offline".to_string()));
        }
        self.inner.commit(batch)
    }
}

/// Delegates to the in-memory store but pauses after reading a ranking snapshot, leaving room for
/// other writers to interleave.
#[derive(Default, Clone)]
pub(super) struct StallingRepository {
    pub(super) inner: InMemoryTransferRepository,
    pub(super) snapshot_taken: Arc<AtomicBool>,
}

impl TransferRepository for StallingRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert_application(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch_application(id)
    }

    fn fetch_evaluation(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.fetch_evaluation(id)
    }

    fn evaluation_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.evaluation_for(application_id)
    }

    fn completed_evaluations(
        &self,
        cohort: &CohortKey,
    ) -> Result<Vec<CohortEntry>, RepositoryError> {
        let entries = self.inner.completed_evaluations(cohort)?;
        self.snapshot_taken.store(true, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(100));
        Ok(entries)
    }

    fn rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        self.inner.rankings(department, period)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        self.inner.commit(batch)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) fn application_router_with_service(service: MemoryService) -> axum::Router {
    transfer_router(Arc::new(service))
}

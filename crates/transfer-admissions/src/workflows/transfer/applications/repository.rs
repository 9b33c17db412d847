use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicantId, Application, ApplicationId, ApplicationPeriod, CohortKey, DepartmentRequirement,
    Evaluation, EvaluationId, ProgramBaseScore, Quota, Ranking, RankingOutcome, Semester,
};

/// A completed evaluation joined to the application it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortEntry {
    pub application: Application,
    pub evaluation: Evaluation,
}

/// Ranking mutation carried by a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum RankingWrite {
    /// Delete every row of `cohort`, then insert `rankings`.
    Replace {
        cohort: CohortKey,
        rankings: Vec<Ranking>,
    },
    /// Overwrite existing rows matched by id.
    Update(Vec<Ranking>),
}

/// Writes that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub applications: Vec<Application>,
    pub evaluations: Vec<Evaluation>,
    pub rankings: Vec<RankingWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    pub fn save_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluations.push(evaluation);
        self
    }

    pub fn rankings(mut self, write: RankingWrite) -> Self {
        self.rankings.push(write);
        self
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait TransferRepository: Send + Sync {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: &ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    fn fetch_evaluation(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError>;
    fn evaluation_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Evaluation>, RepositoryError>;
    /// Completed evaluations whose application targets `cohort`.
    fn completed_evaluations(&self, cohort: &CohortKey)
        -> Result<Vec<CohortEntry>, RepositoryError>;
    fn rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, RepositoryError>;
    /// Apply every write in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError>;
}

/// Externally maintained reference data the engine reads but never writes.
pub trait ReferenceCatalog: Send + Sync {
    fn program_base_score(
        &self,
        department: &str,
        faculty: &str,
        year: i32,
    ) -> Result<Option<ProgramBaseScore>, RepositoryError>;
    fn department_requirements(
        &self,
        department: &str,
        faculty: &str,
    ) -> Result<Vec<DepartmentRequirement>, RepositoryError>;
    /// Semester-specific quota when one exists, otherwise the year-wide one.
    fn quota(
        &self,
        department: &str,
        faculty: &str,
        academic_year: &str,
        semester: Semester,
    ) -> Result<Option<Quota>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound delivery hook (e-mail, SMS or portal inbox adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: TransferNotification) -> Result<(), NotificationError>;
}

/// Per-applicant payload produced by evaluations and ranking runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferNotification {
    pub applicant_id: ApplicantId,
    pub application_number: String,
    pub department: String,
    pub status: RankingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Absent when sent straight from an ineligible evaluation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_applicants: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

//! Transfer application evaluation and ranking.
//!
//! Evaluators verify each applicant's credentials against the target department's rules; the
//! ranking run then orders every completed evaluation of a cohort by composite score and splits
//! it at the department quota. Storage, reference data and notification delivery sit behind the
//! traits in [`repository`].

pub mod domain;
pub mod evaluation;
pub mod memory;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantId, Application, ApplicationId, ApplicationPeriod, ApplicationStatusView, CohortKey,
    DeclaredCredentials, DepartmentPeriod, DepartmentRequirement, Evaluation, EvaluationId,
    EvaluatorId, LetterGrade, NewApplication, PeriodParseError, ProgramBaseScore, Quota, Ranking,
    RankingId, RankingOutcome, RequirementKind, Semester, VerifiedCredentials,
};
pub use evaluation::{EvaluationConfig, EvaluationEngine, EvaluationError, EvaluationFindings};
pub use memory::{InMemoryReferenceCatalog, InMemoryTransferRepository, RecordingNotifier};
pub use ranking::{rank_cohort, RankingCounts, RankingRun};
pub use repository::{
    CohortEntry, NotificationError, NotificationPublisher, RankingWrite, ReferenceCatalog,
    RepositoryError, TransferNotification, TransferRepository, WriteBatch,
};
pub use router::transfer_router;
pub use service::{
    MissingRecord, RankingRunSummary, TransferApplicationService, TransferServiceError,
};
pub use status::{ApplicationStatus, TransitionError};

//! Process-local adapters for the repository, catalog and notification seams. Used by the CLI,
//! the demo server and the test suites.

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Deserialize;

use super::domain::{
    Application, ApplicationId, ApplicationPeriod, CohortKey, DepartmentRequirement, Evaluation,
    EvaluationId, ProgramBaseScore, Quota, Ranking, Semester,
};
use super::repository::{
    CohortEntry, NotificationError, NotificationPublisher, RankingWrite, ReferenceCatalog,
    RepositoryError, TransferNotification, TransferRepository, WriteBatch,
};

#[derive(Debug, Default)]
struct StoreState {
    applications: HashMap<ApplicationId, Application>,
    evaluations: HashMap<EvaluationId, Evaluation>,
    rankings: Vec<Ranking>,
}

/// Mutex-guarded store; `commit` validates the whole batch before touching any record.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransferRepository {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryTransferRepository {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    pub fn applications(&self) -> Result<Vec<Application>, RepositoryError> {
        let state = self.lock()?;
        let mut applications: Vec<_> = state.applications.values().cloned().collect();
        applications.sort_by(|a, b| a.application_number.cmp(&b.application_number));
        Ok(applications)
    }
}

impl TransferRepository for InMemoryTransferRepository {
    fn insert_application(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;
        let duplicate = state.applications.contains_key(&application.id)
            || state
                .applications
                .values()
                .any(|existing| existing.application_number == application.application_number);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        state
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn fetch_evaluation(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        Ok(self.lock()?.evaluations.get(id).cloned())
    }

    fn evaluation_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Evaluation>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .evaluations
            .values()
            .find(|evaluation| &evaluation.application_id == application_id)
            .cloned())
    }

    fn completed_evaluations(
        &self,
        cohort: &CohortKey,
    ) -> Result<Vec<CohortEntry>, RepositoryError> {
        let state = self.lock()?;
        let mut entries: Vec<CohortEntry> = state
            .evaluations
            .values()
            .filter(|evaluation| evaluation.is_completed())
            .filter_map(|evaluation| {
                let application = state.applications.get(&evaluation.application_id)?;
                let in_cohort = cohort.matches(
                    &application.target_department,
                    &application.target_faculty,
                    &application.period,
                );
                in_cohort.then(|| CohortEntry {
                    application: application.clone(),
                    evaluation: evaluation.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.application.id.cmp(&b.application.id));
        Ok(entries)
    }

    fn rankings(
        &self,
        department: &str,
        period: &ApplicationPeriod,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        let state = self.lock()?;
        let mut rankings: Vec<Ranking> = state
            .rankings
            .iter()
            .filter(|ranking| ranking.department == department && &ranking.period == period)
            .cloned()
            .collect();
        rankings.sort_by(|a, b| {
            (a.rank == 0, a.rank, &a.application_number).cmp(&(
                b.rank == 0,
                b.rank,
                &b.application_number,
            ))
        });
        Ok(rankings)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;

        let unknown_application = batch
            .applications
            .iter()
            .any(|application| !state.applications.contains_key(&application.id));
        let orphan_evaluation = batch.evaluations.iter().any(|evaluation| {
            !state.applications.contains_key(&evaluation.application_id)
        });
        let unknown_ranking = batch.rankings.iter().any(|write| match write {
            RankingWrite::Update(rows) => rows
                .iter()
                .any(|row| !state.rankings.iter().any(|existing| existing.id == row.id)),
            RankingWrite::Replace { .. } => false,
        });
        if unknown_application || orphan_evaluation || unknown_ranking {
            return Err(RepositoryError::NotFound);
        }

        for application in batch.applications {
            state.applications.insert(application.id.clone(), application);
        }
        for evaluation in batch.evaluations {
            state.evaluations.insert(evaluation.id.clone(), evaluation);
        }
        for write in batch.rankings {
            match write {
                RankingWrite::Replace { cohort, rankings } => {
                    state.rankings.retain(|row| row.cohort_key() != cohort);
                    state.rankings.extend(rankings);
                }
                RankingWrite::Update(rows) => {
                    for row in rows {
                        if let Some(existing) =
                            state.rankings.iter_mut().find(|existing| existing.id == row.id)
                        {
                            *existing = row;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Reference data held in memory, loadable from a JSON document with `base_scores`,
/// `requirements` and `quotas` arrays.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct InMemoryReferenceCatalog {
    #[serde(default)]
    base_scores: Vec<ProgramBaseScore>,
    #[serde(default)]
    requirements: Vec<DepartmentRequirement>,
    #[serde(default)]
    quotas: Vec<Quota>,
}

impl InMemoryReferenceCatalog {
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    pub fn with_base_score(mut self, base_score: ProgramBaseScore) -> Self {
        self.base_scores.push(base_score);
        self
    }

    pub fn with_requirement(mut self, requirement: DepartmentRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quotas.push(quota);
        self
    }
}

impl ReferenceCatalog for InMemoryReferenceCatalog {
    fn program_base_score(
        &self,
        department: &str,
        faculty: &str,
        year: i32,
    ) -> Result<Option<ProgramBaseScore>, RepositoryError> {
        Ok(self
            .base_scores
            .iter()
            .find(|score| {
                score.department == department && score.faculty == faculty && score.year == year
            })
            .cloned())
    }

    fn department_requirements(
        &self,
        department: &str,
        faculty: &str,
    ) -> Result<Vec<DepartmentRequirement>, RepositoryError> {
        Ok(self
            .requirements
            .iter()
            .filter(|requirement| requirement.applies_to(department, faculty))
            .cloned()
            .collect())
    }

    fn quota(
        &self,
        department: &str,
        faculty: &str,
        academic_year: &str,
        semester: Semester,
    ) -> Result<Option<Quota>, RepositoryError> {
        let candidates = || {
            self.quotas.iter().filter(|quota| {
                quota.department == department
                    && quota.faculty == faculty
                    && quota.academic_year == academic_year
            })
        };

        Ok(candidates()
            .find(|quota| quota.semester == Some(semester))
            .or_else(|| candidates().find(|quota| quota.semester.is_none()))
            .cloned())
    }
}

/// Keeps every notification it receives so callers can inspect them afterwards.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<TransferNotification>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<TransferNotification> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl NotificationPublisher for RecordingNotifier {
    fn publish(&self, notification: TransferNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("notifier lock poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

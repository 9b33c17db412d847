use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluation::EvaluationFindings;
use super::status::{ApplicationStatus, TransitionError};

/// Identifier wrapper for transfer applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for evaluation records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

/// Identifier wrapper for ranking rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankingId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluatorId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Semester {
    Fall,
    Spring,
}

impl Semester {
    pub const fn label(self) -> &'static str {
        match self {
            Semester::Fall => "FALL",
            Semester::Spring => "SPRING",
        }
    }
}

impl FromStr for Semester {
    type Err = PeriodParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FALL" => Ok(Semester::Fall),
            "SPRING" => Ok(Semester::Spring),
            _ => Err(PeriodParseError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("application period '{0}' must look like 2024-2025-FALL")]
pub struct PeriodParseError(pub String);

/// Academic year plus semester, written as `2024-2025-FALL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationPeriod {
    academic_year: String,
    semester: Semester,
}

impl ApplicationPeriod {
    pub fn new(academic_year: &str, semester: Semester) -> Result<Self, PeriodParseError> {
        let academic_year = academic_year.trim();
        let valid = academic_year
            .split_once('-')
            .and_then(|(start, end)| {
                if start.len() != 4 || end.len() != 4 {
                    return None;
                }
                Some((start.parse::<u16>().ok()?, end.parse::<u16>().ok()?))
            })
            .is_some_and(|(start, end)| end == start + 1);

        if !valid {
            return Err(PeriodParseError(format!(
                "{academic_year}-{}",
                semester.label()
            )));
        }

        Ok(Self {
            academic_year: academic_year.to_string(),
            semester,
        })
    }

    pub fn academic_year(&self) -> &str {
        &self.academic_year
    }

    pub fn semester(&self) -> Semester {
        self.semester
    }
}

impl fmt::Display for ApplicationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.academic_year, self.semester.label())
    }
}

impl FromStr for ApplicationPeriod {
    type Err = PeriodParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, semester) = value
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| PeriodParseError(value.to_string()))?;
        let semester = semester
            .parse::<Semester>()
            .map_err(|_| PeriodParseError(value.to_string()))?;
        Self::new(year, semester).map_err(|_| PeriodParseError(value.to_string()))
    }
}

impl TryFrom<String> for ApplicationPeriod {
    type Error = PeriodParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationPeriod> for String {
    fn from(period: ApplicationPeriod) -> Self {
        period.to_string()
    }
}

/// Partition a ranking run operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CohortKey {
    pub department: String,
    pub faculty: String,
    pub period: ApplicationPeriod,
}

impl CohortKey {
    pub fn new(department: &str, faculty: &str, period: ApplicationPeriod) -> Self {
        Self {
            department: department.to_string(),
            faculty: faculty.to_string(),
            period,
        }
    }

    pub fn matches(&self, department: &str, faculty: &str, period: &ApplicationPeriod) -> bool {
        self.department == department && self.faculty == faculty && &self.period == period
    }

    pub fn board(&self) -> DepartmentPeriod {
        DepartmentPeriod {
            department: self.department.clone(),
            period: self.period.clone(),
        }
    }
}

/// Scope used when listing or publishing rankings; spans every faculty of the department.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentPeriod {
    pub department: String,
    pub period: ApplicationPeriod,
}

/// Self-reported figures captured at submission. Never used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredCredentials {
    pub gpa: f64,
    pub exam_score: f64,
    pub exam_rank: u32,
    pub exam_year: i32,
}

/// Intake payload for a new transfer request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub application_number: String,
    pub applicant_id: ApplicantId,
    pub target_faculty: String,
    pub target_department: String,
    pub period: ApplicationPeriod,
    pub declared: DeclaredCredentials,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_number: String,
    pub applicant_id: ApplicantId,
    pub target_faculty: String,
    pub target_department: String,
    pub period: ApplicationPeriod,
    pub declared: DeclaredCredentials,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    pub fn cohort_key(&self) -> CohortKey {
        CohortKey::new(
            &self.target_department,
            &self.target_faculty,
            self.period.clone(),
        )
    }

    /// Move to `next`, recording `reason` when the application is rejected.
    pub fn transition(
        &mut self,
        next: ApplicationStatus,
        reason: Option<String>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.transition_to(next)?;
        if next == ApplicationStatus::Rejected {
            if let Some(reason) = reason {
                self.rejection_reason = Some(reason);
            }
        }
        Ok(())
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            application_number: self.application_number.clone(),
            status: self.status.label(),
            rejection_reason: self.rejection_reason.clone(),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub application_number: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Letter grades ordered `AA > BA > BB > CB > CC > DC > DD > FD > FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    AA,
    BA,
    BB,
    CB,
    CC,
    DC,
    DD,
    FD,
    FF,
}

impl LetterGrade {
    const fn points(self) -> u8 {
        match self {
            LetterGrade::AA => 8,
            LetterGrade::BA => 7,
            LetterGrade::BB => 6,
            LetterGrade::CB => 5,
            LetterGrade::CC => 4,
            LetterGrade::DC => 3,
            LetterGrade::DD => 2,
            LetterGrade::FD => 1,
            LetterGrade::FF => 0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            LetterGrade::AA => "AA",
            LetterGrade::BA => "BA",
            LetterGrade::BB => "BB",
            LetterGrade::CB => "CB",
            LetterGrade::CC => "CC",
            LetterGrade::DC => "DC",
            LetterGrade::DD => "DD",
            LetterGrade::FD => "FD",
            LetterGrade::FF => "FF",
        }
    }

    pub fn meets(self, minimum: LetterGrade) -> bool {
        self >= minimum
    }
}

impl PartialOrd for LetterGrade {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LetterGrade {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.points().cmp(&other.points())
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a letter grade (expected AA, BA, BB, CB, CC, DC, DD, FD or FF)")]
pub struct LetterGradeParseError(pub String);

impl FromStr for LetterGrade {
    type Err = LetterGradeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AA" => Ok(LetterGrade::AA),
            "BA" => Ok(LetterGrade::BA),
            "BB" => Ok(LetterGrade::BB),
            "CB" => Ok(LetterGrade::CB),
            "CC" => Ok(LetterGrade::CC),
            "DC" => Ok(LetterGrade::DC),
            "DD" => Ok(LetterGrade::DD),
            "FD" => Ok(LetterGrade::FD),
            "FF" => Ok(LetterGrade::FF),
            _ => Err(LetterGradeParseError(value.to_string())),
        }
    }
}

/// Figures confirmed by an evaluator against registry sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedCredentials {
    pub gpa: f64,
    pub exam_score: f64,
    pub exam_rank: u32,
    pub exam_year: i32,
    #[serde(default)]
    pub has_external_english: bool,
    #[serde(default)]
    pub has_english_exemption: bool,
    #[serde(default)]
    pub course_grades: Option<BTreeMap<String, LetterGrade>>,
    #[serde(default)]
    pub has_portfolio: Option<bool>,
    #[serde(default)]
    pub evaluator_notes: Option<String>,
}

/// One evaluation per application; re-evaluation overwrites `findings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub application_id: ApplicationId,
    pub evaluator_id: EvaluatorId,
    pub started_at: DateTime<Utc>,
    pub findings: Option<EvaluationFindings>,
    pub evaluator_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Evaluation {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some() && self.findings.is_some()
    }

    pub fn overall_eligible(&self) -> bool {
        self.findings
            .as_ref()
            .is_some_and(|findings| findings.eligibility.overall_eligible())
    }

    pub fn composite_score(&self) -> f64 {
        self.findings
            .as_ref()
            .map(|findings| findings.composite_score)
            .unwrap_or(0.0)
    }

    pub fn eligibility_notes(&self) -> &str {
        self.findings
            .as_ref()
            .map(|findings| findings.eligibility_notes.as_str())
            .unwrap_or_default()
    }
}

/// Outcome class of one applicant within a ranking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankingOutcome {
    Primary,
    Waitlisted,
    NotEligible,
}

impl RankingOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            RankingOutcome::Primary => "PRIMARY",
            RankingOutcome::Waitlisted => "WAITLISTED",
            RankingOutcome::NotEligible => "NOT_ELIGIBLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub id: RankingId,
    pub application_id: ApplicationId,
    pub application_number: String,
    pub department: String,
    pub faculty: String,
    pub period: ApplicationPeriod,
    /// `0` marks an applicant who failed eligibility.
    pub rank: u32,
    pub composite_score: f64,
    pub is_primary: bool,
    pub is_waitlisted: bool,
    pub quota: u32,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

impl Ranking {
    pub fn outcome(&self) -> RankingOutcome {
        if self.is_primary {
            RankingOutcome::Primary
        } else if self.is_waitlisted {
            RankingOutcome::Waitlisted
        } else {
            RankingOutcome::NotEligible
        }
    }

    pub fn cohort_key(&self) -> CohortKey {
        CohortKey::new(&self.department, &self.faculty, self.period.clone())
    }

    /// Marks the row published; an earlier publish timestamp is kept.
    pub fn publish(&mut self, at: DateTime<Utc>) {
        if !self.is_published {
            self.is_published = true;
            self.published_at = Some(at);
        }
    }
}

/// Reference score for a department cohort; denominator of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramBaseScore {
    pub department: String,
    pub faculty: String,
    pub year: i32,
    pub base_score: f64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRequirement {
    pub department: String,
    pub faculty: String,
    pub kind: RequirementKind,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl DepartmentRequirement {
    /// Department and faculty names compare trimmed and ASCII case-insensitive.
    pub fn applies_to(&self, department: &str, faculty: &str) -> bool {
        self.department.trim().eq_ignore_ascii_case(department.trim())
            && self.faculty.trim().eq_ignore_ascii_case(faculty.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequirementKind {
    MinimumCourseGrade {
        course: String,
        minimum_grade: LetterGrade,
    },
    PortfolioRequired,
    ManualReview {
        description: String,
    },
}

/// Seat count for a department; `semester: None` applies to the whole academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub department: String,
    pub faculty: String,
    pub academic_year: String,
    #[serde(default)]
    pub semester: Option<Semester>,
    pub seats: u32,
}

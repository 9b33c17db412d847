mod config;
mod eligibility;
mod requirements;
mod scale;
mod score;

pub use config::EvaluationConfig;
pub use eligibility::{
    evaluate_eligibility, EligibilityCriteria, EligibilityInput, EligibilityVerdict,
};
pub use requirements::{check_department_requirements, RequirementCheck, RequirementEvidence};
pub use scale::{convert_to_100_scale, MAX_GPA};
pub use score::composite_score;

use super::domain::{Application, DepartmentRequirement, VerifiedCredentials};
use serde::{Deserialize, Serialize};

/// Input rejected before any rule is applied.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("GPA {0} is outside the 0.00-4.00 range")]
    GpaOutOfRange(f64),
    #[error("exam score {0} must be a non-negative number")]
    InvalidExamScore(f64),
    #[error("program base score must be positive (found {0})")]
    NonPositiveBaseScore(f64),
}

/// Stateless engine applying the transfer rubric to one application.
pub struct EvaluationEngine {
    config: EvaluationConfig,
}

impl EvaluationEngine {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Verdict and score for `verified` against the application's target department.
    ///
    /// Ineligible applicants always get a composite score of exactly zero. A non-positive base
    /// score is rejected even then.
    pub fn assess(
        &self,
        application: &Application,
        verified: &VerifiedCredentials,
        requirements: &[DepartmentRequirement],
        program_base_score: f64,
    ) -> Result<EvaluationFindings, EvaluationError> {
        if !verified.exam_score.is_finite() || verified.exam_score < 0.0 {
            return Err(EvaluationError::InvalidExamScore(verified.exam_score));
        }
        if !program_base_score.is_finite() || program_base_score <= 0.0 {
            return Err(EvaluationError::NonPositiveBaseScore(program_base_score));
        }

        let gpa_100 = convert_to_100_scale(verified.gpa)?;

        let requirement_check = check_department_requirements(
            &application.target_department,
            &application.target_faculty,
            requirements,
            RequirementEvidence {
                course_grades: verified.course_grades.as_ref(),
                has_portfolio: verified.has_portfolio,
            },
            &self.config,
        );

        let eligibility = evaluate_eligibility(
            &EligibilityInput {
                gpa: verified.gpa,
                gpa_100,
                exam_score: verified.exam_score,
                exam_rank: verified.exam_rank,
                faculty: &application.target_faculty,
                has_external_english: verified.has_external_english,
                has_english_exemption: verified.has_english_exemption,
                requirements: &requirement_check,
            },
            &self.config,
        );

        let composite_score = if eligibility.overall_eligible() {
            score::composite_score(
                verified.exam_score,
                program_base_score,
                gpa_100,
                &self.config,
            )?
        } else {
            0.0
        };

        Ok(EvaluationFindings {
            verified: VerifiedScores {
                gpa: verified.gpa,
                gpa_100,
                exam_score: verified.exam_score,
                exam_rank: verified.exam_rank,
                exam_year: verified.exam_year,
            },
            program_base_score,
            composite_score,
            eligibility_notes: eligibility.notes(),
            eligibility,
            requirements: requirement_check,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedScores {
    pub gpa: f64,
    pub gpa_100: u8,
    pub exam_score: f64,
    pub exam_rank: u32,
    pub exam_year: i32,
}

/// Everything a completed evaluation records about an applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationFindings {
    pub verified: VerifiedScores,
    pub program_base_score: f64,
    pub composite_score: f64,
    pub eligibility: EligibilityVerdict,
    pub eligibility_notes: String,
    pub requirements: RequirementCheck,
}

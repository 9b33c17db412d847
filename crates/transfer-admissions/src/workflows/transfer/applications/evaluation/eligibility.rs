use serde::{Deserialize, Serialize};

use super::config::EvaluationConfig;
use super::requirements::RequirementCheck;

/// The five university-wide criteria, each evaluated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub gpa_eligible: bool,
    pub exam_score_eligible: bool,
    pub exam_rank_eligible: bool,
    pub english_eligible: bool,
    pub department_requirements_met: bool,
}

impl EligibilityCriteria {
    pub fn all_met(&self) -> bool {
        self.gpa_eligible
            && self.exam_score_eligible
            && self.exam_rank_eligible
            && self.english_eligible
            && self.department_requirements_met
    }
}

/// Criteria plus the derived overall flag; `overall_eligible` is always the conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    criteria: EligibilityCriteria,
    overall_eligible: bool,
    reasons: Vec<String>,
}

impl EligibilityVerdict {
    pub fn new(criteria: EligibilityCriteria, reasons: Vec<String>) -> Self {
        Self {
            overall_eligible: criteria.all_met(),
            criteria,
            reasons,
        }
    }

    pub fn criteria(&self) -> EligibilityCriteria {
        self.criteria
    }

    pub fn overall_eligible(&self) -> bool {
        self.overall_eligible
    }

    /// One line per failing criterion, in rule order.
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn notes(&self) -> String {
        self.reasons.join("\n")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EligibilityInput<'a> {
    pub gpa: f64,
    pub gpa_100: u8,
    pub exam_score: f64,
    pub exam_rank: u32,
    pub faculty: &'a str,
    pub has_external_english: bool,
    pub has_english_exemption: bool,
    pub requirements: &'a RequirementCheck,
}

pub fn evaluate_eligibility(
    input: &EligibilityInput<'_>,
    config: &EvaluationConfig,
) -> EligibilityVerdict {
    let mut reasons = Vec::new();

    let gpa_eligible = input.gpa >= config.minimum_gpa && input.gpa_100 >= config.minimum_gpa_100;
    if !gpa_eligible {
        reasons.push(format!(
            "GPA {:.2} ({} on the 100-point scale) is below the minimum {:.2} / {}",
            input.gpa, input.gpa_100, config.minimum_gpa, config.minimum_gpa_100
        ));
    }

    let exam_score_eligible = input.exam_score > 0.0;
    if !exam_score_eligible {
        reasons.push("no valid exam score on record".to_string());
    }

    let threshold = config.rank_threshold(input.faculty);
    let exam_rank_eligible = input.exam_rank <= threshold;
    if !exam_rank_eligible {
        reasons.push(format!(
            "exam rank {} exceeds the limit of {} for {}",
            input.exam_rank, threshold, input.faculty
        ));
    }

    let english_eligible = input.has_external_english || input.has_english_exemption;
    if !english_eligible {
        reasons.push(
            "no English proficiency certificate or institutional exemption".to_string(),
        );
    }

    let department_requirements_met = input.requirements.is_met;
    if !department_requirements_met {
        reasons.push(format!(
            "department requirements not met: {}",
            input.requirements.failures.join("; ")
        ));
    }

    EligibilityVerdict::new(
        EligibilityCriteria {
            gpa_eligible,
            exam_score_eligible,
            exam_rank_eligible,
            english_eligible,
            department_requirements_met,
        },
        reasons,
    )
}

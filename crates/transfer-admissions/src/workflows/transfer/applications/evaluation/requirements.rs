use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::domain::{DepartmentRequirement, LetterGrade, RequirementKind};
use super::config::EvaluationConfig;

/// Evidence an applicant can bring against department-specific rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementEvidence<'a> {
    pub course_grades: Option<&'a BTreeMap<String, LetterGrade>>,
    pub has_portfolio: Option<bool>,
}

/// Result of checking every active requirement of the target department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub is_met: bool,
    /// Every note in requirement order, failures and manual items alike.
    pub notes: Vec<String>,
    /// Notes that made `is_met` false.
    pub failures: Vec<String>,
    pub pending_manual_reviews: Vec<String>,
    pub consulted: Vec<DepartmentRequirement>,
}

impl RequirementCheck {
    pub fn none_configured() -> Self {
        Self {
            is_met: true,
            notes: Vec::new(),
            failures: Vec::new(),
            pending_manual_reviews: Vec::new(),
            consulted: Vec::new(),
        }
    }

    fn fail(&mut self, note: String) {
        self.is_met = false;
        self.notes.push(note.clone());
        self.failures.push(note);
    }
}

pub fn check_department_requirements(
    department: &str,
    faculty: &str,
    requirements: &[DepartmentRequirement],
    evidence: RequirementEvidence<'_>,
    config: &EvaluationConfig,
) -> RequirementCheck {
    let mut check = RequirementCheck::none_configured();

    let applicable = requirements.iter().filter(|requirement| {
        requirement.active && requirement.applies_to(department, faculty)
    });

    for requirement in applicable {
        check.consulted.push(requirement.clone());

        match &requirement.kind {
            RequirementKind::MinimumCourseGrade {
                course,
                minimum_grade,
            } => match grade_for(evidence.course_grades, course) {
                Some(grade) if grade.meets(*minimum_grade) => {}
                Some(grade) => {
                    check.fail(format!(
                        "{course}: grade {grade} is below the required {minimum_grade}"
                    ));
                }
                None => {
                    check.fail(format!(
                        "{course}: no grade on record (minimum {minimum_grade})"
                    ));
                }
            },
            RequirementKind::PortfolioRequired => {
                if !evidence.has_portfolio.unwrap_or(false) {
                    check.fail("portfolio required but not provided".to_string());
                }
            }
            RequirementKind::ManualReview { description } => {
                let note = format!("manual review required: {description}");
                check.pending_manual_reviews.push(description.clone());
                if config.manual_review_blocks {
                    check.fail(note);
                } else {
                    check.notes.push(note);
                }
            }
        }
    }

    check
}

fn grade_for(grades: Option<&BTreeMap<String, LetterGrade>>, course: &str) -> Option<LetterGrade> {
    let grades = grades?;
    grades.get(course).copied().or_else(|| {
        grades
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(course.trim()))
            .map(|(_, grade)| *grade)
    })
}

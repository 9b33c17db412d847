use serde::{Deserialize, Serialize};

pub const MINIMUM_GPA: f64 = 2.50;
pub const MINIMUM_GPA_100: u8 = 70;
pub const ARCHITECTURE_RANK_THRESHOLD: u32 = 250_000;
pub const DEFAULT_RANK_THRESHOLD: u32 = 300_000;
pub const EXAM_WEIGHT: f64 = 0.90;
pub const GPA_WEIGHT: f64 = 0.10;

/// Rubric settings handed to the engine. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub minimum_gpa: f64,
    pub minimum_gpa_100: u8,
    pub architecture_rank_threshold: u32,
    pub default_rank_threshold: u32,
    /// Lower-cased fragments identifying the architecture faculty by name.
    pub architecture_faculty_keywords: Vec<String>,
    pub exam_weight: f64,
    pub gpa_weight: f64,
    /// When set, open manual-review requirements fail `department_requirements_met`.
    pub manual_review_blocks: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            minimum_gpa: MINIMUM_GPA,
            minimum_gpa_100: MINIMUM_GPA_100,
            architecture_rank_threshold: ARCHITECTURE_RANK_THRESHOLD,
            default_rank_threshold: DEFAULT_RANK_THRESHOLD,
            architecture_faculty_keywords: vec![
                "architecture".to_string(),
                "mimarlık".to_string(),
            ],
            exam_weight: EXAM_WEIGHT,
            gpa_weight: GPA_WEIGHT,
            manual_review_blocks: false,
        }
    }
}

impl EvaluationConfig {
    /// Highest admissible exam rank for applicants to `faculty`.
    ///
    /// Only the architecture faculty has its own limit; every other faculty name falls back to
    /// the default.
    pub fn rank_threshold(&self, faculty: &str) -> u32 {
        let normalized = faculty.to_lowercase();
        let is_architecture = self
            .architecture_faculty_keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.to_lowercase().as_str()));

        if is_architecture {
            self.architecture_rank_threshold
        } else {
            self.default_rank_threshold
        }
    }
}

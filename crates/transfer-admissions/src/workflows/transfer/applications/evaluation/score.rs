use super::config::EvaluationConfig;
use super::EvaluationError;

const SCORE_DECIMALS: i32 = 4;

/// `(exam / base) * 100 * exam_weight + gpa_100 * gpa_weight`, rounded to four places.
pub fn composite_score(
    exam_score: f64,
    program_base_score: f64,
    gpa_100: u8,
    config: &EvaluationConfig,
) -> Result<f64, EvaluationError> {
    if !program_base_score.is_finite() || program_base_score <= 0.0 {
        return Err(EvaluationError::NonPositiveBaseScore(program_base_score));
    }

    let exam_component = (exam_score / program_base_score) * 100.0 * config.exam_weight;
    let gpa_component = f64::from(gpa_100) * config.gpa_weight;

    Ok(round_to(exam_component + gpa_component, SCORE_DECIMALS))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

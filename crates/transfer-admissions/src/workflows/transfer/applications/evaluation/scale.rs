use super::EvaluationError;

pub const MAX_GPA: f64 = 4.0;

/// Lower bound in hundredths of a grade point and the score every GPA in that bracket maps to.
/// The last bracket is closed at 4.00.
const BRACKETS: [(u16, u8); 31] = [
    (0, 0),
    (100, 40),
    (110, 42),
    (120, 44),
    (130, 46),
    (140, 48),
    (150, 50),
    (160, 52),
    (170, 54),
    (180, 56),
    (190, 58),
    (200, 60),
    (210, 61),
    (220, 62),
    (230, 63),
    (240, 64),
    (250, 65),
    (260, 67),
    (270, 70),
    (280, 72),
    (290, 74),
    (300, 76),
    (310, 79),
    (320, 81),
    (330, 83),
    (340, 86),
    (350, 88),
    (360, 90),
    (370, 93),
    (380, 96),
    (390, 100),
];

/// Convert a 0.00-4.00 GPA to the official 100-point equivalent.
pub fn convert_to_100_scale(gpa: f64) -> Result<u8, EvaluationError> {
    if !gpa.is_finite() || !(0.0..=MAX_GPA).contains(&gpa) {
        return Err(EvaluationError::GpaOutOfRange(gpa));
    }

    // 2.3 * 100 is 229.999..., so nudge before flooring.
    let hundredths = (gpa * 100.0 + 1e-6).floor() as u16;
    let score = BRACKETS
        .iter()
        .rev()
        .find(|(lower, _)| hundredths >= *lower)
        .map(|(_, score)| *score)
        .unwrap_or(0);

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_match_official_table() {
        assert_eq!(convert_to_100_scale(4.00), Ok(100));
        assert_eq!(convert_to_100_scale(2.50), Ok(65));
        assert_eq!(convert_to_100_scale(0.00), Ok(0));
    }

    #[test]
    fn bracket_edges_do_not_drift() {
        assert_eq!(convert_to_100_scale(2.30), Ok(63));
        assert_eq!(convert_to_100_scale(2.29), Ok(62));
        assert_eq!(convert_to_100_scale(2.69), Ok(67));
        assert_eq!(convert_to_100_scale(2.70), Ok(70));
        assert_eq!(convert_to_100_scale(3.50), Ok(88));
        assert_eq!(convert_to_100_scale(3.95), Ok(100));
        assert_eq!(convert_to_100_scale(0.99), Ok(0));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            convert_to_100_scale(-0.1),
            Err(EvaluationError::GpaOutOfRange(-0.1))
        );
        assert_eq!(
            convert_to_100_scale(4.01),
            Err(EvaluationError::GpaOutOfRange(4.01))
        );
        assert!(convert_to_100_scale(f64::NAN).is_err());
    }

    #[test]
    fn table_is_monotonic_and_gapless() {
        assert_eq!(BRACKETS[0].0, 0);
        for pair in BRACKETS.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 <= pair[1].1);
        }
    }
}

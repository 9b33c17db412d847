use std::collections::BTreeMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub(crate) struct CohortRow {
    pub(crate) application_number: String,
    pub(crate) applicant_id: String,
    pub(crate) faculty: String,
    pub(crate) department: String,
    pub(crate) period: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) submitted_at: Option<String>,
    pub(crate) gpa: f64,
    pub(crate) exam_score: f64,
    pub(crate) exam_rank: u32,
    pub(crate) exam_year: i32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) has_external_english: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) has_english_exemption: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) has_portfolio: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) course_grades: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) evaluator_notes: Option<String>,
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<CohortRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<CohortRow>().collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts `true/false`, `yes/no`, `y/n` and `1/0`, ignoring case.
pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Splits `MATH101:AA;PHYS101:CB` into course/grade pairs, keeping the raw grade text.
pub(crate) fn split_course_grades(value: &str) -> Result<BTreeMap<String, String>, String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .rsplit_once(':')
                .map(|(course, grade)| (course.trim().to_string(), grade.trim().to_string()))
                .filter(|(course, grade)| !course.is_empty() && !grade.is_empty())
                .ok_or_else(|| format!("'{entry}' is not COURSE:GRADE"))
        })
        .collect()
}

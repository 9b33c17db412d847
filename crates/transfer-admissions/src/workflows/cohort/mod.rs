//! Import of evaluated cohorts from a CSV export: one row per applicant with the credentials an
//! evaluator already verified.

mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::workflows::transfer::applications::{
    ApplicantId, ApplicationPeriod, DeclaredCredentials, LetterGrade, NewApplication,
    VerifiedCredentials,
};

use parser::CohortRow;

#[derive(Debug, thiserror::Error)]
pub enum CohortImportError {
    #[error("failed to read cohort export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cohort CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row} ({application_number}): invalid {field}: {message}")]
    InvalidField {
        row: usize,
        application_number: String,
        field: &'static str,
        message: String,
    },
}

/// Applicant intake plus the credentials verified for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortRecord {
    pub application: NewApplication,
    pub credentials: VerifiedCredentials,
}

pub struct CohortImporter;

impl CohortImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<CohortRecord>, CohortImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse every row; the first malformed cell aborts the whole import.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<CohortRecord>, CohortImportError> {
        parser::parse_rows(reader)?
            .into_iter()
            .enumerate()
            .map(|(index, row)| to_record(index + 1, row))
            .collect()
    }
}

fn to_record(row_number: usize, row: CohortRow) -> Result<CohortRecord, CohortImportError> {
    let invalid = |field: &'static str, message: String| CohortImportError::InvalidField {
        row: row_number,
        application_number: row.application_number.clone(),
        field,
        message,
    };

    let period = row
        .period
        .parse::<ApplicationPeriod>()
        .map_err(|err| invalid("period", err.to_string()))?;

    let submitted_at = row
        .submitted_at
        .as_deref()
        .map(|value| {
            parser::parse_timestamp(value)
                .ok_or_else(|| invalid("submitted_at", format!("'{value}' is not a timestamp")))
        })
        .transpose()?;

    type Flag = Result<Option<bool>, CohortImportError>;
    let flag = |field: &'static str, value: Option<&str>| -> Flag {
        value
            .map(|value| {
                parser::parse_flag(value)
                    .ok_or_else(|| invalid(field, format!("'{value}' is not a yes/no value")))
            })
            .transpose()
    };
    let has_external_english = flag("has_external_english", row.has_external_english.as_deref())?;
    let has_english_exemption =
        flag("has_english_exemption", row.has_english_exemption.as_deref())?;
    let has_portfolio = flag("has_portfolio", row.has_portfolio.as_deref())?;

    let course_grades = row
        .course_grades
        .as_deref()
        .map(|value| parse_grades(value).map_err(|message| invalid("course_grades", message)))
        .transpose()?;

    // Declared figures mirror the verified ones; the export carries only the checked values.
    let declared = DeclaredCredentials {
        gpa: row.gpa,
        exam_score: row.exam_score,
        exam_rank: row.exam_rank,
        exam_year: row.exam_year,
    };

    Ok(CohortRecord {
        application: NewApplication {
            application_number: row.application_number.clone(),
            applicant_id: ApplicantId(row.applicant_id.clone()),
            target_faculty: row.faculty.clone(),
            target_department: row.department.clone(),
            period,
            declared,
            submitted_at,
        },
        credentials: VerifiedCredentials {
            gpa: row.gpa,
            exam_score: row.exam_score,
            exam_rank: row.exam_rank,
            exam_year: row.exam_year,
            has_external_english: has_external_english.unwrap_or(false),
            has_english_exemption: has_english_exemption.unwrap_or(false),
            course_grades,
            has_portfolio,
            evaluator_notes: row.evaluator_notes.clone(),
        },
    })
}

fn parse_grades(value: &str) -> Result<BTreeMap<String, LetterGrade>, String> {
    parser::split_course_grades(value)?
        .into_iter()
        .map(|(course, grade)| {
            grade
                .parse::<LetterGrade>()
                .map(|grade| (course, grade))
                .map_err(|err| err.to_string())
        })
        .collect()
}

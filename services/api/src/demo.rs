use crate::infra::{admit_and_evaluate, load_catalog};
use clap::Args;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use transfer_admissions::config::AppConfig;
use transfer_admissions::error::AppError;
use transfer_admissions::workflows::cohort::{CohortImporter, CohortRecord};
use transfer_admissions::workflows::transfer::applications::{
    ApplicationPeriod, EvaluationConfig, EvaluatorId, InMemoryReferenceCatalog,
    InMemoryTransferRepository, NotificationPublisher, RankingRunSummary, RecordingNotifier,
    ReferenceCatalog, TransferApplicationService, TransferRepository,
};

const DEMO_CATALOG: &str = r#"{
  "base_scores": [
    { "department": "Computer Engineering", "faculty": "Faculty of Engineering", "year": 2024, "base_score": 460.0 },
    { "department": "Architecture", "faculty": "Faculty of Architecture", "year": 2024, "base_score": 480.0 }
  ],
  "requirements": [
    { "department": "Computer Engineering", "faculty": "Faculty of Engineering",
      "kind": { "type": "minimum_course_grade", "course": "MATH101", "minimum_grade": "CC" } },
    { "department": "Architecture", "faculty": "Faculty of Architecture",
      "kind": { "type": "portfolio_required" } },
    { "department": "Architecture", "faculty": "Faculty of Architecture",
      "kind": { "type": "manual_review", "description": "studio jury interview" } }
  ],
  "quotas": [
    { "department": "Computer Engineering", "faculty": "Faculty of Engineering", "academic_year": "2024-2025", "seats": 3 },
    { "department": "Architecture", "faculty": "Faculty of Architecture", "academic_year": "2024-2025", "semester": "FALL", "seats": 2 }
  ]
}"#;

const DEMO_COHORT: &str = "\
application_number,applicant_id,faculty,department,period,submitted_at,gpa,exam_score,exam_rank,exam_year,has_external_english,has_english_exemption,has_portfolio,course_grades,evaluator_notes
2024-CE-001,stu-1001,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-15T09:00:00Z,3.62,446.2,41000,2024,yes,no,,MATH101:AA,
2024-CE-002,stu-1002,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-15T09:20:00Z,3.18,431.5,88000,2024,yes,no,,MATH101:BB,
2024-CE-003,stu-1003,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-15T10:05:00Z,2.95,438.0,72000,2024,no,yes,,MATH101:CB,exemption letter on file
2024-CE-004,stu-1004,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-16T08:45:00Z,3.40,420.4,150000,2024,yes,no,,MATH101:CC,
2024-CE-005,stu-1005,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-16T11:30:00Z,2.72,409.9,210000,2024,yes,no,,MATH101:BA,
2024-CE-006,stu-1006,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-17T13:10:00Z,3.75,452.0,305000,2024,yes,no,,MATH101:AA,
2024-CE-007,stu-1007,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-17T15:00:00Z,2.31,425.0,99000,2024,yes,no,,MATH101:BB,
2024-CE-008,stu-1008,Faculty of Engineering,Computer Engineering,2024-2025-FALL,2024-07-18T09:40:00Z,3.05,415.0,120000,2024,yes,no,,MATH101:DC,
2024-AR-001,stu-2001,Faculty of Architecture,Architecture,2024-2025-FALL,2024-07-15T12:00:00Z,3.55,458.0,180000,2024,yes,no,yes,,
2024-AR-002,stu-2002,Faculty of Architecture,Architecture,2024-2025-FALL,2024-07-16T10:15:00Z,3.10,441.0,240000,2024,yes,no,yes,,
2024-AR-003,stu-2003,Faculty of Architecture,Architecture,2024-2025-FALL,2024-07-16T14:30:00Z,3.30,447.5,251000,2024,yes,no,yes,,
2024-AR-004,stu-2004,Faculty of Architecture,Architecture,2024-2025-FALL,2024-07-17T09:05:00Z,2.90,436.0,200000,2024,yes,no,no,,
";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Publish each cohort's ranking after it is generated.
    #[arg(long)]
    pub(crate) publish: bool,
    /// Print every notification payload produced during the demo.
    #[arg(long)]
    pub(crate) show_notifications: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// Cohort CSV export with verified credentials, one row per applicant
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Reference catalog JSON (defaults to TRANSFER_CATALOG_PATH)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Target department of the cohort
    #[arg(long)]
    pub(crate) department: String,
    /// Faculty owning the department
    #[arg(long)]
    pub(crate) faculty: String,
    /// Application period, e.g. 2024-2025-FALL
    #[arg(long, value_parser = crate::infra::parse_period)]
    pub(crate) period: ApplicationPeriod,
    /// Evaluator recorded on every evaluation
    #[arg(long, default_value = "cli")]
    pub(crate) evaluator: String,
    /// Publish the ranking once generated
    #[arg(long)]
    pub(crate) publish: bool,
}

pub(crate) fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        csv,
        catalog,
        department,
        faculty,
        period,
        evaluator,
        publish,
    } = args;

    let config = AppConfig::load()?;
    let catalog = load_catalog(catalog.or(config.catalog_path).as_deref())?;
    let notifier = Arc::new(RecordingNotifier::default());
    let service = TransferApplicationService::new(
        Arc::new(InMemoryTransferRepository::default()),
        Arc::new(catalog),
        notifier.clone(),
        config.evaluation,
    );

    let records: Vec<CohortRecord> = CohortImporter::from_path(&csv)?
        .into_iter()
        .filter(|record| {
            record.application.target_department == department
                && record.application.target_faculty == faculty
                && record.application.period == period
        })
        .collect();

    if records.is_empty() {
        println!(
            "No rows in {} for {} / {} ({})",
            csv.display(),
            department,
            faculty,
            period
        );
        return Ok(());
    }

    let evaluator = EvaluatorId(evaluator);
    for record in records {
        admit_and_evaluate(&service, record, &evaluator)?;
    }

    let summary = service.generate_rankings(&department, &faculty, &period)?;
    render_ranking(&service, &summary)?;

    if publish {
        let published = service.publish_rankings(&department, &period)?;
        println!("Published {} ranking rows", published.len());
    }
    println!("Notifications queued: {}", notifier.events().len());

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        publish,
        show_notifications,
    } = args;

    println!("Transfer admissions demo");
    let catalog = InMemoryReferenceCatalog::from_json_reader(DEMO_CATALOG.as_bytes())?;
    let records = CohortImporter::from_reader(Cursor::new(DEMO_COHORT))?;
    let notifier = Arc::new(RecordingNotifier::default());
    let service = TransferApplicationService::new(
        Arc::new(InMemoryTransferRepository::default()),
        Arc::new(catalog),
        notifier.clone(),
        EvaluationConfig::default(),
    );

    let cohorts: BTreeSet<(String, String, ApplicationPeriod)> = records
        .iter()
        .map(|record| {
            (
                record.application.target_department.clone(),
                record.application.target_faculty.clone(),
                record.application.period.clone(),
            )
        })
        .collect();

    let evaluator = EvaluatorId("ygk-demo".to_string());
    println!("- Evaluating {} imported applications", records.len());
    for record in records {
        let (application, evaluation) = admit_and_evaluate(&service, record, &evaluator)?;
        if !evaluation.overall_eligible() {
            println!(
                "  {} rejected at evaluation: {}",
                application.application_number,
                application
                    .rejection_reason
                    .as_deref()
                    .unwrap_or("no reason recorded")
                    .replace('\n', "; ")
            );
        }
    }

    for (department, faculty, period) in &cohorts {
        let summary = service.generate_rankings(department, faculty, period)?;
        render_ranking(&service, &summary)?;
        if publish {
            let published = service.publish_rankings(department, period)?;
            println!("  Published {} rows", published.len());
        }
    }

    let events = notifier.events();
    println!("\nNotifications dispatched: {}", events.len());
    if show_notifications {
        for event in events {
            match serde_json::to_string(&event) {
                Ok(json) => println!("  {json}"),
                Err(err) => println!("  notification payload unavailable: {err}"),
            }
        }
    }

    Ok(())
}

fn render_ranking<R, C, N>(
    service: &TransferApplicationService<R, C, N>,
    summary: &RankingRunSummary,
) -> Result<(), AppError>
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    println!(
        "\n{} / {} ({})",
        summary.cohort.department, summary.cohort.faculty, summary.cohort.period
    );
    println!(
        "  quota {} | {} evaluated | {} primary | {} waitlisted | {} not eligible",
        summary.quota,
        summary.counts.total_evaluated,
        summary.counts.primary,
        summary.counts.waitlisted,
        summary.counts.not_eligible
    );
    if summary.undelivered_notifications > 0 {
        println!(
            "  {} notifications could not be delivered",
            summary.undelivered_notifications
        );
    }

    println!(
        "  {:>4}  {:<12}  {:>8}  {:<12}  status",
        "rank", "application", "score", "outcome"
    );
    for ranking in &summary.rankings {
        let application = service.get_application(&ranking.application_id)?;
        let rank = if ranking.rank == 0 {
            "-".to_string()
        } else {
            ranking.rank.to_string()
        };
        println!(
            "  {:>4}  {:<12}  {:>8.4}  {:<12}  {}",
            rank,
            ranking.application_number,
            ranking.composite_score,
            ranking.outcome().label(),
            application.status.label()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use transfer_admissions::workflows::transfer::applications::{ApplicationStatus, Semester};

    #[test]
    fn demo_fixtures_parse() {
        let catalog = InMemoryReferenceCatalog::from_json_reader(DEMO_CATALOG.as_bytes())
            .expect("catalog parses");
        let quota = catalog
            .quota(
                "Architecture",
                "Faculty of Architecture",
                "2024-2025",
                Semester::Fall,
            )
            .expect("lookup succeeds")
            .expect("quota configured");
        assert_eq!(quota.seats, 2);

        let records = CohortImporter::from_reader(Cursor::new(DEMO_COHORT)).expect("cohort parses");
        assert_eq!(records.len(), 12);
    }

    #[test]
    fn demo_cohort_ranks_as_expected() {
        let catalog = InMemoryReferenceCatalog::from_json_reader(DEMO_CATALOG.as_bytes())
            .expect("catalog parses");
        let service = TransferApplicationService::new(
            Arc::new(InMemoryTransferRepository::default()),
            Arc::new(catalog),
            Arc::new(RecordingNotifier::default()),
            EvaluationConfig::default(),
        );
        let evaluator = EvaluatorId("ygk-test".to_string());
        for record in CohortImporter::from_reader(Cursor::new(DEMO_COHORT)).expect("cohort parses")
        {
            admit_and_evaluate(&service, record, &evaluator).expect("evaluation succeeds");
        }
        let period = crate::infra::parse_period("2024-2025-FALL").expect("valid period");

        let engineering = service
            .generate_rankings("Computer Engineering", "Faculty of Engineering", &period)
            .expect("ranking succeeds");
        assert_eq!(engineering.counts.total_evaluated, 8);
        assert_eq!(engineering.counts.primary, 3);
        assert_eq!(engineering.counts.waitlisted, 2);
        assert_eq!(engineering.counts.not_eligible, 3);
        assert_eq!(engineering.rankings[0].application_number, "2024-CE-001");

        let architecture = service
            .generate_rankings("Architecture", "Faculty of Architecture", &period)
            .expect("ranking succeeds");
        assert_eq!(architecture.counts.primary, 2);
        assert_eq!(architecture.counts.not_eligible, 2);
        let rejected = service
            .get_application(&architecture.rankings[3].application_id)
            .expect("application exists");
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
    }

    #[test]
    fn run_demo_completes_with_publication() {
        run_demo(DemoArgs {
            publish: true,
            show_notifications: true,
        })
        .expect("demo runs");
    }
}

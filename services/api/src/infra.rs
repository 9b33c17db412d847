use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};
use transfer_admissions::error::AppError;
use transfer_admissions::workflows::cohort::CohortRecord;
use transfer_admissions::workflows::transfer::applications::{
    Application, ApplicationPeriod, ApplicationStatus, Evaluation, EvaluatorId,
    InMemoryReferenceCatalog, NotificationError, NotificationPublisher, ReferenceCatalog,
    TransferApplicationService, TransferNotification, TransferRepository,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Delivery adapter for the HTTP service: every notification becomes a structured log line.
#[derive(Default, Clone)]
pub(crate) struct TracingNotifier;

impl NotificationPublisher for TracingNotifier {
    fn publish(&self, notification: TransferNotification) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(&notification)
            .map_err(|err| NotificationError::Transport(err.to_string()))?;
        info!(
            applicant = %notification.applicant_id.0,
            application_number = %notification.application_number,
            %payload,
            "applicant notification"
        );
        Ok(())
    }
}

pub(crate) fn load_catalog(path: Option<&Path>) -> Result<InMemoryReferenceCatalog, AppError> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            let catalog =
                InMemoryReferenceCatalog::from_json_reader(std::io::BufReader::new(file))?;
            info!(path = %path.display(), "reference catalog loaded");
            Ok(catalog)
        }
        None => {
            warn!("no reference catalog configured; evaluations will fail until one is supplied");
            Ok(InMemoryReferenceCatalog::default())
        }
    }
}

pub(crate) fn parse_period(raw: &str) -> Result<ApplicationPeriod, String> {
    raw.parse::<ApplicationPeriod>()
        .map_err(|err| err.to_string())
}

/// Walk one imported row through intake, routing and evaluation.
pub(crate) fn admit_and_evaluate<R, C, N>(
    service: &TransferApplicationService<R, C, N>,
    record: CohortRecord,
    evaluator: &EvaluatorId,
) -> Result<(Application, Evaluation), AppError>
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    let CohortRecord {
        application,
        credentials,
    } = record;

    let application = service.register_application(application)?;
    for status in [
        ApplicationStatus::FacultyRouting,
        ApplicationStatus::DepartmentRouting,
    ] {
        service.route_application(&application.id, status, None)?;
    }
    let evaluation = service.begin_or_resume_evaluation(&application.id, evaluator)?;
    let evaluation = service.evaluate(&evaluation.id, evaluator, credentials)?;
    let application = service.get_application(&application.id)?;

    Ok((application, evaluation))
}

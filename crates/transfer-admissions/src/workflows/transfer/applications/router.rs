use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    ApplicationId, ApplicationPeriod, EvaluationId, EvaluatorId, VerifiedCredentials,
};
use super::repository::{
    NotificationPublisher, ReferenceCatalog, RepositoryError, TransferRepository,
};
use super::service::{TransferApplicationService, TransferServiceError};

#[derive(Debug, Deserialize)]
pub struct BeginEvaluationRequest {
    pub evaluator_id: EvaluatorId,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub evaluator_id: EvaluatorId,
    #[serde(flatten)]
    pub verified: VerifiedCredentials,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRankingsRequest {
    pub department: String,
    pub faculty: String,
    pub period: ApplicationPeriod,
}

/// Router exposing evaluation and ranking endpoints for admissions staff.
pub fn transfer_router<R, C, N>(service: Arc<TransferApplicationService<R, C, N>>) -> Router
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/transfer/applications/:application_id",
            get(application_handler::<R, C, N>),
        )
        .route(
            "/api/v1/transfer/applications/:application_id/evaluations",
            post(begin_evaluation_handler::<R, C, N>),
        )
        .route(
            "/api/v1/transfer/evaluations/:evaluation_id",
            put(evaluate_handler::<R, C, N>),
        )
        .route(
            "/api/v1/transfer/rankings",
            post(generate_rankings_handler::<R, C, N>),
        )
        .route(
            "/api/v1/transfer/rankings/:department/:period",
            get(rankings_handler::<R, C, N>),
        )
        .route(
            "/api/v1/transfer/rankings/:department/:period/publish",
            post(publish_handler::<R, C, N>),
        )
        .with_state(service)
}

pub(crate) async fn application_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get_application(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn begin_evaluation_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<BeginEvaluationRequest>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.begin_or_resume_evaluation(&ApplicationId(application_id), &request.evaluator_id)
    {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    Path(evaluation_id): Path<String>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.evaluate(
        &EvaluationId(evaluation_id),
        &request.evaluator_id,
        request.verified,
    ) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn generate_rankings_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    axum::Json(request): axum::Json<GenerateRankingsRequest>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    match service.generate_rankings(&request.department, &request.faculty, &request.period) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn rankings_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    Path((department, period)): Path<(String, String)>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    let period = match period.parse::<ApplicationPeriod>() {
        Ok(period) => period,
        Err(error) => return unprocessable(error.to_string()),
    };

    match service.get_rankings(&department, &period) {
        Ok(rankings) => (StatusCode::OK, axum::Json(rankings)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn publish_handler<R, C, N>(
    State(service): State<Arc<TransferApplicationService<R, C, N>>>,
    Path((department, period)): Path<(String, String)>,
) -> Response
where
    R: TransferRepository + 'static,
    C: ReferenceCatalog + 'static,
    N: NotificationPublisher + 'static,
{
    let period = match period.parse::<ApplicationPeriod>() {
        Ok(period) => period,
        Err(error) => return unprocessable(error.to_string()),
    };

    match service.publish_rankings(&department, &period) {
        Ok(rankings) => {
            let payload = json!({
                "department": department,
                "period": period.to_string(),
                "published": rankings.len(),
                "rankings": rankings,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn unprocessable(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

fn error_response(error: TransferServiceError) -> Response {
    let status = match &error {
        TransferServiceError::NotFound(_)
        | TransferServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TransferServiceError::Evaluation(_)
        | TransferServiceError::MissingQuota { .. }
        | TransferServiceError::RankingOwnedStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TransferServiceError::Transition(_)
        | TransferServiceError::EvaluationClosed { .. }
        | TransferServiceError::RankingAlreadyPublished { .. }
        | TransferServiceError::RankingNotPublished { .. }
        | TransferServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TransferServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %error, "transfer request failed");
    }

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

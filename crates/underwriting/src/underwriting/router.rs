use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditSink;
use super::domain::AssessmentId;
use super::intake::AssessmentSubmission;
use super::repository::{AssessmentRepository, NotificationPublisher, RepositoryError};
use super::service::{CommentDraft, UnderwritingService, UnderwritingServiceError};
use super::workflow::{StepId, WorkflowError, WorkflowStatus};

type SharedService<R, N, A> = Arc<UnderwritingService<R, N, A>>;

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub status: WorkflowStatus,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EscalationRequest {
    pub reason: String,
}

/// HTTP endpoints for intake, evaluation and the review workflow.
pub fn assessment_router<R, N, A>(service: SharedService<R, N, A>) -> Router
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(submit_handler::<R, N, A>))
        .route(
            "/api/v1/assessments/:assessment_id",
            get(status_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/evaluate",
            post(evaluate_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/reassess",
            post(reassess_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/comments",
            post(comment_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/compliance",
            get(compliance_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/workflow",
            post(initialize_workflow_handler::<R, N, A>).get(workflow_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/workflow/steps/:step_id",
            post(progress_handler::<R, N, A>),
        )
        .route(
            "/api/v1/assessments/:assessment_id/workflow/escalate",
            post(escalate_handler::<R, N, A>),
        )
        .with_state(service)
}

/// HTTP status for a service failure.
pub(crate) fn status_for(error: &UnderwritingServiceError) -> StatusCode {
    match error {
        UnderwritingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        UnderwritingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        UnderwritingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        UnderwritingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        UnderwritingServiceError::Workflow(
            WorkflowError::NotInitialized(_) | WorkflowError::StepNotFound { .. },
        ) => StatusCode::NOT_FOUND,
        UnderwritingServiceError::Workflow(
            WorkflowError::AlreadyInitialized(_) | WorkflowError::WorkflowClosed(_),
        )
        | UnderwritingServiceError::NotPending { .. }
        | UnderwritingServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
    }
}

pub(crate) fn error_response(error: UnderwritingServiceError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        UnderwritingServiceError::Validation(errors) => json!({
            "error": error.to_string(),
            "fields": errors.fields(),
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}

/// Body that failed to decode, reported in the same shape as field validation errors.
pub(crate) fn rejection_response(rejection: JsonRejection) -> Response {
    let payload = json!({
        "error": "invalid assessment payload",
        "fields": [{ "field": "body", "message": rejection.body_text() }],
    });
    (rejection.status(), axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    payload: Result<axum::Json<AssessmentSubmission>, JsonRejection>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    let axum::Json(submission) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    match service.submit(submission) {
        Ok(record) => (StatusCode::ACCEPTED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.get(&AssessmentId(assessment_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluate_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.evaluate(&AssessmentId(assessment_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reassess_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.reassess(&AssessmentId(assessment_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn comment_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
    axum::Json(draft): axum::Json<CommentDraft>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.add_comment(&AssessmentId(assessment_id), draft) {
        Ok(comment) => (StatusCode::CREATED, axum::Json(comment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn compliance_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.compliance(&AssessmentId(assessment_id)) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn initialize_workflow_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.initialize_workflow(&AssessmentId(assessment_id)) {
        Ok(steps) => (StatusCode::CREATED, axum::Json(steps)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn workflow_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.workflow(&AssessmentId(assessment_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn progress_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path((assessment_id, step_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<ProgressRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.progress_workflow(
        &AssessmentId(assessment_id),
        &StepId(step_id),
        request.status,
        request.comments,
    ) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn escalate_handler<R, N, A>(
    State(service): State<SharedService<R, N, A>>,
    Path(assessment_id): Path<String>,
    axum::Json(request): axum::Json<EscalationRequest>,
) -> Response
where
    R: AssessmentRepository + 'static,
    N: NotificationPublisher + 'static,
    A: AuditSink + 'static,
{
    match service.escalate_workflow(&AssessmentId(assessment_id), &request.reason) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

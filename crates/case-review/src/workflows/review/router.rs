use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditLog;
use super::domain::{CaseId, DrawingRef, ReviewOutcome, ReviewerId, Verdict};
use super::repository::{CaseRepository, ReviewerDirectory};
use super::service::{CaseWorkflow, WorkflowError};

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub drawing_ref: DrawingRef,
    pub verdict: Verdict,
}

#[derive(Debug, Deserialize)]
pub struct ScreenRequest {
    pub drawing_ref: DrawingRef,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub actor_id: ReviewerId,
    pub final_status: ReviewOutcome,
    pub report: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    pub reviewer_id: ReviewerId,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Router builder exposing the workflow to the HTTP boundary.
pub fn case_router<R, D, A>(workflow: Arc<CaseWorkflow<R, D, A>>) -> Router
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    Router::new()
        .route(
            "/api/v1/cases",
            post(intake_handler::<R, D, A>).get(list_handler::<R, D, A>),
        )
        .route("/api/v1/cases/:case_id", get(case_handler::<R, D, A>))
        .route(
            "/api/v1/cases/:case_id/review",
            post(review_handler::<R, D, A>),
        )
        .route(
            "/api/v1/cases/:case_id/reviewer",
            put(reassign_handler::<R, D, A>),
        )
        .route("/api/v1/drawings/screen", post(screen_handler::<R, D, A>))
        .route(
            "/api/v1/reviewers/:reviewer_id/cases",
            get(worklist_handler::<R, D, A>),
        )
        .route("/api/v1/audit", get(audit_handler::<R, D, A>))
        .with_state(workflow)
}

pub(crate) fn error_response(error: WorkflowError) -> Response {
    let status = match &error {
        WorkflowError::CaseNotFound(_) | WorkflowError::ReviewerNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
        WorkflowError::Forbidden { .. } => StatusCode::FORBIDDEN,
        WorkflowError::InvalidReviewer(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
        "retryable": error.is_retryable(),
    });
    (status, Json(payload)).into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, WorkflowError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn intake_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Json(request): Json<IntakeRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(
        StatusCode::CREATED,
        workflow.intake(request.drawing_ref, request.verdict),
    )
}

pub(crate) async fn screen_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Json(request): Json<ScreenRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(
        StatusCode::CREATED,
        workflow.screen(request.drawing_ref).await,
    )
}

pub(crate) async fn case_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(StatusCode::OK, workflow.get(&CaseId(case_id)))
}

pub(crate) async fn list_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(StatusCode::OK, workflow.all_cases())
}

pub(crate) async fn worklist_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Path(reviewer_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(StatusCode::OK, workflow.assigned_to(&ReviewerId(reviewer_id)))
}

pub(crate) async fn review_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Path(case_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    let ReviewRequest {
        actor_id,
        final_status,
        report,
    } = request;
    respond(
        StatusCode::OK,
        workflow.submit_review(&CaseId(case_id), &actor_id, final_status, report),
    )
}

pub(crate) async fn reassign_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Path(case_id): Path<String>,
    Json(request): Json<ReassignRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(
        StatusCode::OK,
        workflow.reassign(&CaseId(case_id), &request.reviewer_id),
    )
}

pub(crate) async fn audit_handler<R, D, A>(
    State(workflow): State<Arc<CaseWorkflow<R, D, A>>>,
    Query(query): Query<AuditQuery>,
) -> Response
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    respond(StatusCode::OK, workflow.recent_audit_entries(query.limit))
}

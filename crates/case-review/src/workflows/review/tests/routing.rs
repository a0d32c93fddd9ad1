use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::workflows::review::audit::MemoryAuditLog;
use crate::workflows::review::domain::{CaseId, Reviewer};
use crate::workflows::review::memory::MemoryReviewerDirectory;
use crate::workflows::review::router::{
    self, case_router, error_response, ReassignRequest, ReviewRequest,
};
use crate::workflows::review::service::{CaseWorkflow, WorkflowError};

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
        .expect("request builds")
}

#[test]
fn error_kinds_map_to_status_codes() {
    let cases = [
        (
            WorkflowError::CaseNotFound(CaseId("c".to_string())),
            StatusCode::NOT_FOUND,
        ),
        (
            WorkflowError::ReviewerNotFound(rid("r")),
            StatusCode::NOT_FOUND,
        ),
        (
            WorkflowError::InvalidTransition {
                case_id: CaseId("c".to_string()),
                status: crate::workflows::review::domain::CaseStatus::ResolvedNoConcern,
                operation: "review submission",
            },
            StatusCode::CONFLICT,
        ),
        (
            WorkflowError::Forbidden {
                case_id: CaseId("c".to_string()),
                actor: rid("r2"),
            },
            StatusCode::FORBIDDEN,
        ),
        (
            WorkflowError::InvalidReviewer(rid("r")),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            WorkflowError::DependencyUnavailable("store".to_string()),
            StatusCode::SERVICE_UNAVAILABLE,
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error_response(error).status(), expected);
    }
}

#[tokio::test]
async fn intake_route_creates_flagged_case() {
    let (workflow, _, _, _) = build_workflow(vec![Reviewer::active("r1", "Ada")]);
    let router = case_router(Arc::new(workflow));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/cases",
            json!({
                "drawing_ref": "drawings/route.png",
                "verdict": flagged_verdict(),
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], json!("FlaggedForReview"));
    assert_eq!(payload["reviewer"], json!("r1"));
    assert!(payload["resolved_at"].is_null());
}

#[tokio::test]
async fn review_route_rejects_non_terminal_status() {
    let (workflow, _, _, _) = build_workflow(vec![Reviewer::active("r1", "Ada")]);
    let case = workflow
        .intake(drawing("wire"), flagged_verdict())
        .expect("intake");
    let router = case_router(Arc::new(workflow));

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/cases/{}/review", case.id),
            json!({
                "actor_id": "r1",
                "final_status": "FlaggedForReview",
                "report": "still looking",
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn review_handler_returns_forbidden_for_other_reviewer() {
    let (workflow, _, _, _) = build_workflow(vec![
        Reviewer::active("r1", "Ada"),
        Reviewer::active("r2", "Brook"),
    ]);
    let case = workflow
        .intake(drawing("guarded"), flagged_verdict())
        .expect("intake");

    let response = router::review_handler(
        State(Arc::new(workflow)),
        Path(case.id.0.clone()),
        Json(ReviewRequest {
            actor_id: rid("r2"),
            final_status: crate::workflows::review::domain::ReviewOutcome::NoConcern,
            report: "looks fine".to_string(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], json!(false));
}

#[tokio::test]
async fn reassign_handler_rejects_inactive_reviewer() {
    let (workflow, _, _, _) = build_workflow(vec![Reviewer::active("r1", "Ada"), inactive("r9")]);
    let case = workflow
        .intake(drawing("admin"), flagged_verdict())
        .expect("intake");

    let response = router::reassign_handler(
        State(Arc::new(workflow)),
        Path(case.id.0.clone()),
        Json(ReassignRequest {
            reviewer_id: rid("r9"),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn case_route_returns_not_found_for_unknown_id() {
    let (workflow, _, _, _) = build_workflow(Vec::new());
    let router = case_router(Arc::new(workflow));

    let response = router
        .oneshot(
            Request::get("/api/v1/cases/case-unknown")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn screen_route_reports_timeout_as_unavailable() {
    let (workflow, _, _, _) = build_workflow_with_classifier(
        vec![Reviewer::active("r1", "Ada")],
        Arc::new(SlowClassifier(Duration::from_millis(600))),
    );
    let router = case_router(Arc::new(workflow));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/drawings/screen",
            json!({ "drawing_ref": "drawings/slow.png" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], json!(true));
}

#[tokio::test]
async fn worklist_and_audit_routes_return_newest_first() {
    let directory = Arc::new(MemoryReviewerDirectory::with_reviewers(vec![
        Reviewer::active("r1", "Ada"),
    ]));
    let audit = Arc::new(MemoryAuditLog::default());
    let workflow = Arc::new(CaseWorkflow::new(
        Arc::new(crate::workflows::review::memory::MemoryCaseRepository::default()),
        directory,
        audit,
        static_classifier(flagged_verdict()),
        workflow_config(),
    ));
    workflow
        .intake(drawing("one"), flagged_verdict())
        .expect("intake");
    workflow
        .intake(drawing("two"), flagged_verdict())
        .expect("intake");
    let router = case_router(workflow);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/reviewers/r1/cases")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let worklist = read_json_body(response).await;
    assert_eq!(worklist.as_array().map(Vec::len), Some(2));

    let response = router
        .oneshot(
            Request::get("/api/v1/audit?limit=3")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let entries = read_json_body(response).await;
    let entries = entries.as_array().expect("array payload");
    assert_eq!(entries.len(), 3);
    assert!(entries[0]["message"]
        .as_str()
        .unwrap_or_default()
        .contains("assigned to reviewer r1"));
}

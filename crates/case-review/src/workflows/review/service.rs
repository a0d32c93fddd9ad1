use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};

use crate::config::WorkflowConfig;

use super::assignment::{AssignmentEngine, AssignmentOutcome};
use super::audit::{AuditEntry, AuditLog};
use super::classifier::{Classifier, ClassifierError};
use super::domain::{
    Case, CaseId, CaseStatus, DrawingRef, ReviewOutcome, ReviewerId, Role, Verdict,
};
use super::repository::{CaseRepository, RepositoryError, ReviewerDirectory};

/// Owns the case state machine. It is the only component that changes a case's status.
pub struct CaseWorkflow<R, D, A> {
    repository: Arc<R>,
    directory: Arc<D>,
    audit: Arc<A>,
    classifier: Arc<dyn Classifier>,
    engine: AssignmentEngine,
    config: WorkflowConfig,
    // Serialises "read pool, read loads, pick, insert case" across concurrent intakes.
    assignment_gate: Mutex<()>,
}

static CASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_case_id() -> CaseId {
    let id = CASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CaseId(format!("case-{id:06}"))
}

impl<R, D, A> CaseWorkflow<R, D, A>
where
    R: CaseRepository + 'static,
    D: ReviewerDirectory + 'static,
    A: AuditLog + 'static,
{
    pub fn new(
        repository: Arc<R>,
        directory: Arc<D>,
        audit: Arc<A>,
        classifier: Arc<dyn Classifier>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            audit,
            classifier,
            engine: AssignmentEngine,
            config,
            assignment_gate: Mutex::new(()),
        }
    }

    /// Classify a drawing under the configured deadline, then run intake with the verdict.
    ///
    /// No case exists unless classification returned in time with a usable verdict.
    pub async fn screen(&self, drawing: DrawingRef) -> Result<Case, WorkflowError> {
        let classifier = Arc::clone(&self.classifier);
        let target = drawing.clone();
        let call = tokio::task::spawn_blocking(move || classifier.classify(&target));

        let verdict = match tokio::time::timeout(self.config.classification_timeout, call).await {
            Err(_) => {
                warn!(drawing = %drawing, "classification deadline exceeded");
                return Err(WorkflowError::DependencyUnavailable(format!(
                    "classification did not complete within {}ms",
                    self.config.classification_timeout.as_millis()
                )));
            }
            Ok(Err(join)) => {
                return Err(WorkflowError::DependencyUnavailable(format!(
                    "classification task failed: {join}"
                )))
            }
            Ok(Ok(result)) => result.and_then(checked_verdict).map_err(|err| {
                warn!(drawing = %drawing, error = %err, "classification failed");
                WorkflowError::DependencyUnavailable(err.to_string())
            })?,
        };

        self.intake(drawing, verdict)
    }

    /// Create a case for a classified drawing and drive it to the status its verdict implies.
    pub fn intake(&self, drawing: DrawingRef, verdict: Verdict) -> Result<Case, WorkflowError> {
        let now = Utc::now();
        let mut case = Case::intake(next_case_id(), drawing, verdict, now);

        if !case.verdict.review_required {
            case.resolve(CaseStatus::ResolvedNoConcern, now);
            let stored = self.repository.insert(case).map_err(unavailable)?;
            info!(case_id = %stored.id, status = %stored.status, "case cleared at intake");
            self.audit(
                format!(
                    "Drawing {} screened with no concerns (confidence {:.2}); case {} resolved",
                    stored.drawing, stored.verdict.confidence, stored.id
                ),
                None,
                Some(&stored.id),
            );
            return Ok(stored);
        }

        case.flag(now);
        let (stored, outcome, drifted) = {
            let _gate = self
                .assignment_gate
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            let outcome = match self.directory.list_active(Role::Reviewer) {
                Ok(pool) => self.engine.select(self.repository.as_ref(), &pool),
                Err(err) => {
                    warn!(error = %err, "reviewer pool unavailable; leaving case unassigned");
                    AssignmentOutcome::LoadUnavailable(err.to_string())
                }
            };

            let mut drifted = false;
            if let Some(reviewer) = outcome.reviewer() {
                drifted = matches!(self.directory.is_active(reviewer), Ok(false));
                case.reviewer = Some(reviewer.clone());
            }

            let stored = self.repository.insert(case).map_err(unavailable)?;
            (stored, outcome, drifted)
        };

        info!(
            case_id = %stored.id,
            reviewer_id = ?stored.reviewer,
            "case flagged for review"
        );
        self.audit(
            format!(
                "Drawing {} automatically flagged for review (confidence {:.2}, {} indicator(s)); case {} opened",
                stored.drawing,
                stored.verdict.confidence,
                stored.verdict.indicators.len(),
                stored.id
            ),
            None,
            Some(&stored.id),
        );

        let assignment = match &outcome {
            AssignmentOutcome::Assigned {
                reviewer,
                open_cases: Some(open),
            } => format!("Case {} assigned to reviewer {reviewer} ({open} open case(s))", stored.id),
            AssignmentOutcome::Assigned { reviewer, .. } => {
                format!("Case {} assigned to reviewer {reviewer}", stored.id)
            }
            AssignmentOutcome::NoActiveReviewers => format!(
                "No active reviewers; case {} requires manual assignment",
                stored.id
            ),
            AssignmentOutcome::LoadUnavailable(reason) => format!(
                "Reviewer load unavailable ({reason}); case {} requires manual assignment",
                stored.id
            ),
        };
        self.audit(assignment, None, Some(&stored.id));

        if drifted {
            if let Some(reviewer) = stored.reviewer.as_ref() {
                warn!(case_id = %stored.id, reviewer_id = %reviewer, "assigned reviewer went inactive");
                self.audit(
                    format!(
                        "Reviewer {reviewer} was deactivated before case {} committed; reassignment recommended",
                        stored.id
                    ),
                    None,
                    Some(&stored.id),
                );
            }
        }

        Ok(stored)
    }

    /// Record the assigned reviewer's conclusion and resolve the case.
    pub fn submit_review(
        &self,
        case_id: &CaseId,
        actor: &ReviewerId,
        outcome: ReviewOutcome,
        report: String,
    ) -> Result<Case, WorkflowError> {
        let case = self.load(case_id)?;

        if case.status != CaseStatus::FlaggedForReview {
            return Err(WorkflowError::InvalidTransition {
                case_id: case.id,
                status: case.status,
                operation: "review submission",
            });
        }
        if case.reviewer.as_ref() != Some(actor) {
            return Err(WorkflowError::Forbidden {
                case_id: case.id,
                actor: actor.clone(),
            });
        }

        let expected = case.revision;
        let mut next = case;
        next.reviewer_report = Some(report);
        next.resolve(outcome.status(), Utc::now());

        let stored = self
            .repository
            .update(next, expected)
            .map_err(|err| self.commit_error(err, case_id, "review submission"))?;

        info!(case_id = %stored.id, reviewer_id = %actor, status = %stored.status, "review submitted");
        self.audit(
            format!(
                "Reviewer {actor} completed review of case {}: {}",
                stored.id, stored.status
            ),
            Some(actor),
            Some(&stored.id),
        );
        Ok(stored)
    }

    /// Administrative override of the assigned reviewer. Status and timestamps are untouched.
    pub fn reassign(
        &self,
        case_id: &CaseId,
        new_reviewer: &ReviewerId,
    ) -> Result<Case, WorkflowError> {
        let case = self.load(case_id)?;
        let target = self
            .directory
            .find(new_reviewer)
            .map_err(|err| WorkflowError::DependencyUnavailable(err.to_string()))?
            .ok_or_else(|| WorkflowError::ReviewerNotFound(new_reviewer.clone()))?;
        if target.role != Role::Reviewer || !target.is_active() {
            return Err(WorkflowError::InvalidReviewer(new_reviewer.clone()));
        }

        let previous = case.reviewer.clone();
        let expected = case.revision;
        let mut next = case;
        next.reviewer = Some(new_reviewer.clone());

        let stored = self
            .repository
            .update(next, expected)
            .map_err(|err| self.commit_error(err, case_id, "reassignment"))?;

        let from = previous
            .as_ref()
            .map(|id| id.0.as_str())
            .unwrap_or("unassigned");
        let message = if stored.status.is_resolved() {
            format!(
                "Case {} reassigned from {from} to {new_reviewer} after resolution ({})",
                stored.id, stored.status
            )
        } else {
            format!("Case {} reassigned from {from} to {new_reviewer}", stored.id)
        };
        info!(case_id = %stored.id, reviewer_id = %new_reviewer, "case reassigned");
        self.audit(message, None, Some(&stored.id));
        Ok(stored)
    }

    pub fn get(&self, case_id: &CaseId) -> Result<Case, WorkflowError> {
        self.load(case_id)
    }

    /// A reviewer's worklist, most recent first.
    pub fn assigned_to(&self, reviewer: &ReviewerId) -> Result<Vec<Case>, WorkflowError> {
        self.repository.assigned_to(reviewer).map_err(unavailable)
    }

    pub fn all_cases(&self) -> Result<Vec<Case>, WorkflowError> {
        self.repository.all().map_err(unavailable)
    }

    /// Most recent audit entries first; `None` uses the configured page size.
    pub fn recent_audit_entries(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<AuditEntry>, WorkflowError> {
        let limit = limit.unwrap_or(self.config.recent_audit_limit);
        self.audit
            .recent(limit)
            .map_err(|err| WorkflowError::DependencyUnavailable(err.to_string()))
    }

    fn load(&self, case_id: &CaseId) -> Result<Case, WorkflowError> {
        self.repository
            .fetch(case_id)
            .map_err(unavailable)?
            .ok_or_else(|| WorkflowError::CaseNotFound(case_id.clone()))
    }

    fn commit_error(
        &self,
        err: RepositoryError,
        case_id: &CaseId,
        operation: &'static str,
    ) -> WorkflowError {
        match err {
            RepositoryError::StaleRevision { .. } | RepositoryError::Conflict => {
                let status = self
                    .repository
                    .fetch(case_id)
                    .ok()
                    .flatten()
                    .map(|case| case.status)
                    .unwrap_or(CaseStatus::FlaggedForReview);
                WorkflowError::InvalidTransition {
                    case_id: case_id.clone(),
                    status,
                    operation,
                }
            }
            RepositoryError::NotFound => WorkflowError::CaseNotFound(case_id.clone()),
            RepositoryError::Unavailable(reason) => WorkflowError::DependencyUnavailable(reason),
        }
    }

    fn audit(&self, message: String, actor: Option<&ReviewerId>, case_id: Option<&CaseId>) {
        if let Err(err) = self.audit.record(message, actor, case_id) {
            warn!(error = %err, case_id = ?case_id, "audit entry dropped");
        }
    }
}

fn unavailable(err: RepositoryError) -> WorkflowError {
    WorkflowError::DependencyUnavailable(err.to_string())
}

fn checked_verdict(verdict: Verdict) -> Result<Verdict, ClassifierError> {
    let in_range = |value: f32| (0.0..=1.0).contains(&value);
    if !in_range(verdict.confidence) {
        return Err(ClassifierError::InvalidResponse(format!(
            "confidence {} outside 0..=1",
            verdict.confidence
        )));
    }
    if let Some(indicator) = verdict.indicators.iter().find(|i| !in_range(i.confidence)) {
        return Err(ClassifierError::InvalidResponse(format!(
            "indicator {} confidence {} outside 0..=1",
            indicator.name, indicator.confidence
        )));
    }
    Ok(verdict)
}

/// Error raised by the case workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("case {0} not found")]
    CaseNotFound(CaseId),
    #[error("reviewer {0} not found")]
    ReviewerNotFound(ReviewerId),
    #[error("case {case_id} is {status}; {operation} is not permitted")]
    InvalidTransition {
        case_id: CaseId,
        status: CaseStatus,
        operation: &'static str,
    },
    #[error("reviewer {actor} is not assigned to case {case_id}")]
    Forbidden { case_id: CaseId, actor: ReviewerId },
    #[error("reviewer {0} is inactive or cannot review cases")]
    InvalidReviewer(ReviewerId),
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl WorkflowError {
    /// Only dependency failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::DependencyUnavailable(_))
    }
}

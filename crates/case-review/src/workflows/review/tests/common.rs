use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::workflows::review::audit::{AuditEntry, AuditError, AuditLog, MemoryAuditLog};
use crate::workflows::review::classifier::{Classifier, ClassifierError, StaticClassifier};
use crate::workflows::review::domain::{
    Activity, Case, CaseId, CaseStatus, DrawingRef, Indicator, Reviewer, ReviewerId, Role,
    Verdict,
};
use crate::workflows::review::memory::{MemoryCaseRepository, MemoryReviewerDirectory};
use crate::workflows::review::repository::{
    CaseRepository, DirectoryError, RepositoryError, ReviewerDirectory,
};
use crate::workflows::review::service::CaseWorkflow;

pub(super) type MemoryWorkflow =
    CaseWorkflow<MemoryCaseRepository, MemoryReviewerDirectory, MemoryAuditLog>;

pub(super) fn rid(raw: &str) -> ReviewerId {
    ReviewerId(raw.to_string())
}

pub(super) fn drawing(raw: &str) -> DrawingRef {
    DrawingRef(format!("drawings/{raw}.png"))
}

pub(super) fn flagged_verdict() -> Verdict {
    Verdict {
        review_required: true,
        confidence: 0.82,
        indicators: vec![
            Indicator {
                name: "emotional_tension".to_string(),
                evidence: vec!["Heavy line pressure detected".to_string()],
                confidence: 0.82,
            },
            Indicator {
                name: "insecurity".to_string(),
                evidence: vec!["Small figure size relative to page".to_string()],
                confidence: 0.76,
            },
        ],
        model_version: Some("htp-ml-v1.0".to_string()),
    }
}

pub(super) fn cleared_verdict() -> Verdict {
    Verdict::cleared(0.12)
}

pub(super) fn inactive(id: &str) -> Reviewer {
    Reviewer {
        activity: Activity::Inactive,
        ..Reviewer::active(id, id)
    }
}

pub(super) fn uploader(id: &str) -> Reviewer {
    Reviewer {
        role: Role::Uploader,
        ..Reviewer::active(id, id)
    }
}

pub(super) fn workflow_config() -> WorkflowConfig {
    WorkflowConfig {
        classification_timeout: Duration::from_millis(200),
        recent_audit_limit: 10,
    }
}

pub(super) fn static_classifier(verdict: Verdict) -> Arc<dyn Classifier> {
    Arc::new(StaticClassifier::new(verdict))
}

pub(super) fn build_workflow(
    reviewers: Vec<Reviewer>,
) -> (
    MemoryWorkflow,
    Arc<MemoryCaseRepository>,
    Arc<MemoryReviewerDirectory>,
    Arc<MemoryAuditLog>,
) {
    build_workflow_with_classifier(reviewers, static_classifier(flagged_verdict()))
}

pub(super) fn build_workflow_with_classifier(
    reviewers: Vec<Reviewer>,
    classifier: Arc<dyn Classifier>,
) -> (
    MemoryWorkflow,
    Arc<MemoryCaseRepository>,
    Arc<MemoryReviewerDirectory>,
    Arc<MemoryAuditLog>,
) {
    let repository = Arc::new(MemoryCaseRepository::default());
    let directory = Arc::new(MemoryReviewerDirectory::with_reviewers(reviewers));
    let audit = Arc::new(MemoryAuditLog::default());
    let workflow = CaseWorkflow::new(
        repository.clone(),
        directory.clone(),
        audit.clone(),
        classifier,
        workflow_config(),
    );
    (workflow, repository, directory, audit)
}

pub(super) fn messages(entries: &[AuditEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.message.clone()).collect()
}

/// Sleeps past any sensible deadline before answering.
pub(super) struct SlowClassifier(pub(super) Duration);

impl Classifier for SlowClassifier {
    fn classify(&self, _drawing: &DrawingRef) -> Result<Verdict, ClassifierError> {
        std::thread::sleep(self.0);
        Ok(flagged_verdict())
    }
}

pub(super) struct OfflineClassifier;

impl Classifier for OfflineClassifier {
    fn classify(&self, _drawing: &DrawingRef) -> Result<Verdict, ClassifierError> {
        Err(ClassifierError::Unavailable("connection refused".to_string()))
    }
}

/// Memory store whose aggregate query always fails.
#[derive(Default)]
pub(super) struct LoadlessRepository {
    pub(super) inner: MemoryCaseRepository,
}

impl CaseRepository for LoadlessRepository {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError> {
        self.inner.insert(case)
    }

    fn update(&self, case: Case, expected_revision: u64) -> Result<Case, RepositoryError> {
        self.inner.update(case, expected_revision)
    }

    fn fetch(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn assigned_to(&self, reviewer: &ReviewerId) -> Result<Vec<Case>, RepositoryError> {
        self.inner.assigned_to(reviewer)
    }

    fn all(&self) -> Result<Vec<Case>, RepositoryError> {
        self.inner.all()
    }

    fn count_by_reviewer(
        &self,
        _status: CaseStatus,
        _reviewers: &[ReviewerId],
    ) -> Result<HashMap<ReviewerId, usize>, RepositoryError> {
        Err(RepositoryError::Unavailable("aggregate pipeline offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl CaseRepository for UnavailableRepository {
    fn insert(&self, _case: Case) -> Result<Case, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _case: Case, _expected_revision: u64) -> Result<Case, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn assigned_to(&self, _reviewer: &ReviewerId) -> Result<Vec<Case>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Case>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count_by_reviewer(
        &self,
        _status: CaseStatus,
        _reviewers: &[ReviewerId],
    ) -> Result<HashMap<ReviewerId, usize>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Lists every reviewer as active but reports them inactive on direct lookup, as if they
/// were deactivated between the pool snapshot and the commit.
pub(super) struct DriftingDirectory(pub(super) Vec<Reviewer>);

impl ReviewerDirectory for DriftingDirectory {
    fn list_active(&self, _role: Role) -> Result<Vec<Reviewer>, DirectoryError> {
        Ok(self.0.clone())
    }

    fn find(&self, id: &ReviewerId) -> Result<Option<Reviewer>, DirectoryError> {
        Ok(self
            .0
            .iter()
            .find(|reviewer| &reviewer.id == id)
            .map(|reviewer| Reviewer {
                activity: Activity::Inactive,
                ..reviewer.clone()
            }))
    }
}

pub(super) struct OfflineDirectory;

impl ReviewerDirectory for OfflineDirectory {
    fn list_active(&self, _role: Role) -> Result<Vec<Reviewer>, DirectoryError> {
        Err(DirectoryError::Unavailable("ldap timeout".to_string()))
    }

    fn find(&self, _id: &ReviewerId) -> Result<Option<Reviewer>, DirectoryError> {
        Err(DirectoryError::Unavailable("ldap timeout".to_string()))
    }
}

pub(super) struct FailingAuditLog;

impl AuditLog for FailingAuditLog {
    fn record(
        &self,
        _message: String,
        _actor: Option<&ReviewerId>,
        _case_id: Option<&CaseId>,
    ) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("disk full".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        Err(AuditError::Unavailable("disk full".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

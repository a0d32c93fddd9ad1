use std::collections::HashMap;

use super::domain::{Case, CaseId, CaseStatus, Reviewer, ReviewerId, Role};

/// Storage abstraction so the workflow can be exercised in isolation.
///
/// `update` is a compare-and-set: it commits only when the stored revision still equals
/// `expected_revision`, and the stored copy comes back with the revision bumped.
pub trait CaseRepository: Send + Sync {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError>;
    fn update(&self, case: Case, expected_revision: u64) -> Result<Case, RepositoryError>;
    fn fetch(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError>;
    fn assigned_to(&self, reviewer: &ReviewerId) -> Result<Vec<Case>, RepositoryError>;
    fn all(&self) -> Result<Vec<Case>, RepositoryError>;
    /// Count cases in `status` grouped by assigned reviewer, restricted to `reviewers`.
    /// Reviewers without matching cases may be absent from the result.
    fn count_by_reviewer(
        &self,
        status: CaseStatus,
        reviewers: &[ReviewerId],
    ) -> Result<HashMap<ReviewerId, usize>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record revision changed (expected {expected}, found {found})")]
    StaleRevision { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the user-management collaborator.
pub trait ReviewerDirectory: Send + Sync {
    fn list_active(&self, role: Role) -> Result<Vec<Reviewer>, DirectoryError>;
    fn find(&self, id: &ReviewerId) -> Result<Option<Reviewer>, DirectoryError>;

    fn is_active(&self, id: &ReviewerId) -> Result<bool, DirectoryError> {
        Ok(self
            .find(id)?
            .map(|reviewer| reviewer.is_active())
            .unwrap_or(false))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("reviewer directory unavailable: {0}")]
    Unavailable(String),
}

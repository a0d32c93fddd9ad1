use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::domain::{Activity, Case, CaseId, CaseStatus, Reviewer, ReviewerId, Role};
use super::repository::{CaseRepository, DirectoryError, ReviewerDirectory, RepositoryError};

/// Reference `CaseRepository` backed by a single mutex. Every operation, including the
/// revision check in `update`, happens under the lock, so updates are atomic per document.
#[derive(Debug, Default)]
pub struct MemoryCaseRepository {
    records: Mutex<HashMap<CaseId, Case>>,
}

impl MemoryCaseRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CaseId, Case>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

fn newest_first(mut cases: Vec<Case>) -> Vec<Case> {
    cases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    cases
}

impl CaseRepository for MemoryCaseRepository {
    fn insert(&self, case: Case) -> Result<Case, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&case.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(case.id.clone(), case.clone());
        Ok(case)
    }

    fn update(&self, mut case: Case, expected_revision: u64) -> Result<Case, RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard.get_mut(&case.id).ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::StaleRevision {
                expected: expected_revision,
                found: stored.revision,
            });
        }
        case.revision = expected_revision + 1;
        *stored = case.clone();
        Ok(case)
    }

    fn fetch(&self, id: &CaseId) -> Result<Option<Case>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn assigned_to(&self, reviewer: &ReviewerId) -> Result<Vec<Case>, RepositoryError> {
        let cases = self
            .lock()?
            .values()
            .filter(|case| case.reviewer.as_ref() == Some(reviewer))
            .cloned()
            .collect();
        Ok(newest_first(cases))
    }

    fn all(&self) -> Result<Vec<Case>, RepositoryError> {
        Ok(newest_first(self.lock()?.values().cloned().collect()))
    }

    fn count_by_reviewer(
        &self,
        status: CaseStatus,
        reviewers: &[ReviewerId],
    ) -> Result<HashMap<ReviewerId, usize>, RepositoryError> {
        let guard = self.lock()?;
        let mut counts = HashMap::new();
        for case in guard.values().filter(|case| case.status == status) {
            if let Some(reviewer) = case.reviewer.as_ref() {
                if reviewers.contains(reviewer) {
                    *counts.entry(reviewer.clone()).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}

/// Reference directory. Insertion order is preserved, which fixes the pool order that
/// assignment tie-breaks depend on.
#[derive(Debug, Default)]
pub struct MemoryReviewerDirectory {
    users: RwLock<Vec<Reviewer>>,
}

impl MemoryReviewerDirectory {
    pub fn with_reviewers(reviewers: Vec<Reviewer>) -> Self {
        Self {
            users: RwLock::new(reviewers),
        }
    }

    /// Add a user, replacing any existing entry with the same id in place.
    pub fn upsert(&self, reviewer: Reviewer) -> Result<(), DirectoryError> {
        let mut users = self.write()?;
        match users.iter_mut().find(|user| user.id == reviewer.id) {
            Some(existing) => *existing = reviewer,
            None => users.push(reviewer),
        }
        Ok(())
    }

    pub fn set_activity(&self, id: &ReviewerId, activity: Activity) -> Result<bool, DirectoryError> {
        let mut users = self.write()?;
        Ok(match users.iter_mut().find(|user| &user.id == id) {
            Some(user) => {
                user.activity = activity;
                true
            }
            None => false,
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Reviewer>>, DirectoryError> {
        self.users
            .write()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Reviewer>>, DirectoryError> {
        self.users
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl ReviewerDirectory for MemoryReviewerDirectory {
    fn list_active(&self, role: Role) -> Result<Vec<Reviewer>, DirectoryError> {
        Ok(self
            .read()?
            .iter()
            .filter(|user| user.role == role && user.is_active())
            .cloned()
            .collect())
    }

    fn find(&self, id: &ReviewerId) -> Result<Option<Reviewer>, DirectoryError> {
        Ok(self.read()?.iter().find(|user| &user.id == id).cloned())
    }
}

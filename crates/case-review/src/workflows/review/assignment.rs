use std::collections::HashMap;

use tracing::{debug, warn};

use super::domain::{CaseStatus, Reviewer, ReviewerId};
use super::repository::CaseRepository;

/// Result of a least-loaded selection.
///
/// `NoActiveReviewers` and `LoadUnavailable` both leave the case unassigned, but only the
/// former means the pool was empty; the latter carries the store error that degraded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// `open_cases` is `None` when the pool had a single member and no load was read.
    Assigned {
        reviewer: ReviewerId,
        open_cases: Option<usize>,
    },
    NoActiveReviewers,
    LoadUnavailable(String),
}

impl AssignmentOutcome {
    pub fn reviewer(&self) -> Option<&ReviewerId> {
        match self {
            AssignmentOutcome::Assigned { reviewer, .. } => Some(reviewer),
            _ => None,
        }
    }
}

/// Picks the reviewer with the fewest open (`FlaggedForReview`) cases.
///
/// Ties go to whichever reviewer comes first in the pool. There is no secondary key, so a
/// stable pool order will keep favouring the same reviewer among equals; this is a simple
/// rule, not a fair one.
pub struct AssignmentEngine;

impl AssignmentEngine {
    pub fn select<R>(&self, repository: &R, pool: &[Reviewer]) -> AssignmentOutcome
    where
        R: CaseRepository + ?Sized,
    {
        match pool {
            [] => AssignmentOutcome::NoActiveReviewers,
            [only] => AssignmentOutcome::Assigned {
                reviewer: only.id.clone(),
                open_cases: None,
            },
            _ => {
                let ids: Vec<ReviewerId> = pool.iter().map(|reviewer| reviewer.id.clone()).collect();
                match repository.count_by_reviewer(CaseStatus::FlaggedForReview, &ids) {
                    Ok(loads) => least_loaded(&ids, &loads),
                    Err(err) => {
                        warn!(error = %err, "load query failed; leaving case unassigned");
                        AssignmentOutcome::LoadUnavailable(err.to_string())
                    }
                }
            }
        }
    }
}

fn least_loaded(pool: &[ReviewerId], loads: &HashMap<ReviewerId, usize>) -> AssignmentOutcome {
    let mut best: Option<(&ReviewerId, usize)> = None;
    for reviewer in pool {
        let load = loads.get(reviewer).copied().unwrap_or(0);
        if best.map_or(true, |(_, min)| load < min) {
            best = Some((reviewer, load));
        }
    }

    match best {
        Some((reviewer, open_cases)) => {
            debug!(reviewer_id = %reviewer, open_cases, "selected least-loaded reviewer");
            AssignmentOutcome::Assigned {
                reviewer: reviewer.clone(),
                open_cases: Some(open_cases),
            }
        }
        None => AssignmentOutcome::NoActiveReviewers,
    }
}

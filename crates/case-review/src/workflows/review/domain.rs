use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for screening cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub String);

/// Identifier wrapper for reviewers (and any other directory user acting on a case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewerId(pub String);

/// Non-owning reference to the screened drawing held by the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawingRef(pub String);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReviewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DrawingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a case. A case holds exactly one status at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    IntakeScreening,
    FlaggedForReview,
    ResolvedNoConcern,
    ResolvedFollowUpNeeded,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CaseStatus::IntakeScreening => "intake_screening",
            CaseStatus::FlaggedForReview => "flagged_for_review",
            CaseStatus::ResolvedNoConcern => "resolved_no_concern",
            CaseStatus::ResolvedFollowUpNeeded => "resolved_follow_up_needed",
        }
    }

    pub const fn is_resolved(self) -> bool {
        matches!(
            self,
            CaseStatus::ResolvedNoConcern | CaseStatus::ResolvedFollowUpNeeded
        )
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal result a reviewer may record. Only the two resolved statuses are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    NoConcern,
    FollowUpNeeded,
}

impl ReviewOutcome {
    pub const fn status(self) -> CaseStatus {
        match self {
            ReviewOutcome::NoConcern => CaseStatus::ResolvedNoConcern,
            ReviewOutcome::FollowUpNeeded => CaseStatus::ResolvedFollowUpNeeded,
        }
    }
}

impl TryFrom<CaseStatus> for ReviewOutcome {
    type Error = CaseStatus;

    fn try_from(status: CaseStatus) -> Result<Self, Self::Error> {
        match status {
            CaseStatus::ResolvedNoConcern => Ok(ReviewOutcome::NoConcern),
            CaseStatus::ResolvedFollowUpNeeded => Ok(ReviewOutcome::FollowUpNeeded),
            other => Err(other),
        }
    }
}

/// One psychological indicator surfaced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub confidence: f32,
}

/// Structured classifier output. Immutable once recorded on a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub review_required: bool,
    pub confidence: f32,
    #[serde(default)]
    pub indicators: Vec<Indicator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl Verdict {
    pub fn cleared(confidence: f32) -> Self {
        Self {
            review_required: false,
            confidence,
            indicators: Vec::new(),
            model_version: None,
        }
    }

    pub fn flagged(confidence: f32, indicators: Vec<Indicator>) -> Self {
        Self {
            review_required: true,
            confidence,
            indicators,
            model_version: None,
        }
    }
}

/// Directory roles. Only `Reviewer` participates in assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Uploader,
    Reviewer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Active,
    Inactive,
}

/// Read-only projection of a directory user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: ReviewerId,
    pub name: String,
    pub role: Role,
    pub activity: Activity,
}

impl Reviewer {
    pub fn active(id: &str, name: &str) -> Self {
        Self {
            id: ReviewerId(id.to_string()),
            name: name.to_string(),
            role: Role::Reviewer,
            activity: Activity::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.activity == Activity::Active
    }
}

/// Case record as persisted by the store.
///
/// `revision` is the optimistic concurrency token; every committed update bumps it by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub created_at: DateTime<Utc>,
    pub drawing: DrawingRef,
    pub reviewer: Option<ReviewerId>,
    pub status: CaseStatus,
    pub verdict: Verdict,
    pub reviewer_report: Option<String>,
    pub flagged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Case {
    pub(crate) fn intake(id: CaseId, drawing: DrawingRef, verdict: Verdict, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            drawing,
            reviewer: None,
            status: CaseStatus::IntakeScreening,
            verdict,
            reviewer_report: None,
            flagged_at: None,
            resolved_at: None,
            revision: 0,
        }
    }

    pub(crate) fn flag(&mut self, now: DateTime<Utc>) {
        self.status = CaseStatus::FlaggedForReview;
        self.flagged_at = Some(now);
    }

    pub(crate) fn resolve(&mut self, status: CaseStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_resolved());
        self.status = status;
        self.resolved_at = Some(now);
    }

    /// True when the timestamp fields agree with the status history.
    pub fn timestamps_consistent(&self) -> bool {
        let resolved_ok = self.resolved_at.is_some() == self.status.is_resolved();
        let flagged_ok = match self.status {
            CaseStatus::FlaggedForReview | CaseStatus::ResolvedFollowUpNeeded => {
                self.flagged_at.is_some()
            }
            CaseStatus::IntakeScreening => self.flagged_at.is_none(),
            CaseStatus::ResolvedNoConcern => true,
        };
        resolved_ok && flagged_ok
    }
}

//! Case assignment and review workflow for screened drawings.
//!
//! A case enters through `CaseWorkflow::intake` (or `screen`, which runs the classifier
//! first), is routed to the least-loaded active reviewer when its verdict asks for review,
//! and is resolved by that reviewer through `submit_review`. Every transition leaves an
//! entry in the `AuditLog`.

pub mod assignment;
pub mod audit;
pub mod classifier;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use assignment::{AssignmentEngine, AssignmentOutcome};
pub use audit::{AuditEntry, AuditError, AuditLog, MemoryAuditLog};
pub use classifier::{Classifier, ClassifierError, StaticClassifier};
pub use domain::{
    Activity, Case, CaseId, CaseStatus, DrawingRef, Indicator, ReviewOutcome, Reviewer,
    ReviewerId, Role, Verdict,
};
pub use memory::{MemoryCaseRepository, MemoryReviewerDirectory};
pub use repository::{CaseRepository, DirectoryError, RepositoryError, ReviewerDirectory};
pub use router::case_router;
pub use service::{CaseWorkflow, WorkflowError};

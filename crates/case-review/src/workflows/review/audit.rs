use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{CaseId, ReviewerId};

/// Immutable record of a notable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ReviewerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<CaseId>,
}

/// Append-only audit trail. There is deliberately no update or delete.
pub trait AuditLog: Send + Sync {
    fn record(
        &self,
        message: String,
        actor: Option<&ReviewerId>,
        case_id: Option<&CaseId>,
    ) -> Result<(), AuditError>;

    /// Most recent entries first, at most `limit` of them.
    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// In-process audit log. Readers and writers share an `RwLock`, so `recent` never blocks on
/// another reader and always observes whole entries.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    sequence: AtomicU64,
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries for one case, oldest first.
    pub fn for_case(&self, case_id: &CaseId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.case_id.as_ref() == Some(case_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(
        &self,
        message: String,
        actor: Option<&ReviewerId>,
        case_id: Option<&CaseId>,
    ) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?;
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        entries.push(AuditEntry {
            id,
            recorded_at: Utc::now(),
            message,
            actor: actor.cloned(),
            case_id: case_id.cloned(),
        });
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuditError::Unavailable("audit lock poisoned".to_string()))?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

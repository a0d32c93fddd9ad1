use super::domain::{DrawingRef, Verdict};

/// The external ML classification call. Implementations may block (HTTP client, model
/// runtime); the workflow runs them off the async executor and enforces the deadline.
pub trait Classifier: Send + Sync {
    fn classify(&self, drawing: &DrawingRef) -> Result<Verdict, ClassifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classification service unavailable: {0}")]
    Unavailable(String),
    #[error("classification response rejected: {0}")]
    InvalidResponse(String),
}

/// Returns the same verdict for every drawing.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    verdict: Verdict,
}

impl StaticClassifier {
    pub fn new(verdict: Verdict) -> Self {
        Self { verdict }
    }
}

impl Classifier for StaticClassifier {
    fn classify(&self, _drawing: &DrawingRef) -> Result<Verdict, ClassifierError> {
        Ok(self.verdict.clone())
    }
}

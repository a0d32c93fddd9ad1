use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use case_review::config::WorkflowConfig;
use case_review::workflows::review::{
    Activity, CaseWorkflow, Classifier, ClassifierError, DrawingRef, Indicator, MemoryAuditLog,
    MemoryCaseRepository, MemoryReviewerDirectory, Reviewer, ReviewerId, Role, Verdict,
};
use metrics_exporter_prometheus::PrometheusHandle;

pub(crate) const MOCK_MODEL_VERSION: &str = "htp-ml-mock-v1.0";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type ServiceWorkflow =
    CaseWorkflow<MemoryCaseRepository, MemoryReviewerDirectory, MemoryAuditLog>;

/// Stand-in for the external ML service. Sleeps to mimic network latency and derives the
/// verdict from a hash of the drawing reference so repeated uploads classify the same way.
pub(crate) struct MockClassifier {
    latency: Duration,
}

impl MockClassifier {
    pub(crate) fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

fn digest(drawing: &DrawingRef) -> u32 {
    drawing
        .0
        .bytes()
        .fold(17u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(byte as u32))
}

impl Classifier for MockClassifier {
    fn classify(&self, drawing: &DrawingRef) -> Result<Verdict, ClassifierError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        let digest = digest(drawing);
        let mut verdict = if digest % 2 == 1 {
            Verdict::flagged(
                0.70 + (digest % 25) as f32 / 100.0,
                vec![
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
            )
        } else {
            Verdict::cleared((digest % 30) as f32 / 100.0)
        };
        verdict.model_version = Some(MOCK_MODEL_VERSION.to_string());
        Ok(verdict)
    }
}

fn user(id: &str, name: &str, role: Role) -> Reviewer {
    Reviewer {
        id: ReviewerId(id.to_string()),
        name: name.to_string(),
        role,
        activity: Activity::Active,
    }
}

/// Starter accounts: one admin, one uploader and two assessors.
pub(crate) fn seed_directory() -> MemoryReviewerDirectory {
    MemoryReviewerDirectory::with_reviewers(vec![
        user("admin", "Administrator", Role::Admin),
        user("uploader1", "Uploader One", Role::Uploader),
        user("assessor1", "Assessor One", Role::Reviewer),
        user("assessor2", "Assessor Two", Role::Reviewer),
    ])
}

pub(crate) fn build_workflow(
    directory: Arc<MemoryReviewerDirectory>,
    config: WorkflowConfig,
    classifier_latency: Duration,
) -> Arc<ServiceWorkflow> {
    Arc::new(CaseWorkflow::new(
        Arc::new(MemoryCaseRepository::default()),
        directory,
        Arc::new(MemoryAuditLog::default()),
        Arc::new(MockClassifier::new(classifier_latency)),
        config,
    ))
}

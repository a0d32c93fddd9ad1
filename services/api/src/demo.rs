use crate::infra::{build_workflow, seed_directory, ServiceWorkflow};
use case_review::config::WorkflowConfig;
use case_review::error::AppError;
use case_review::workflows::review::{
    Activity, Case, CaseStatus, DrawingRef, ReviewOutcome, ReviewerId,
};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of drawings to screen before reviews start.
    #[arg(long, default_value_t = 6)]
    pub(crate) drawings: usize,
    /// How many audit entries to print at the end.
    #[arg(long, default_value_t = 10)]
    pub(crate) audit_entries: usize,
    /// Skip the reviewer deactivation step.
    #[arg(long)]
    pub(crate) skip_deactivation: bool,
}

fn describe(case: &Case) -> String {
    let reviewer = case
        .reviewer
        .as_ref()
        .map(|id| id.0.as_str())
        .unwrap_or("unassigned");
    format!(
        "{} [{}] drawing {} -> {} (confidence {:.2})",
        case.id, case.status, case.drawing, reviewer, case.verdict.confidence
    )
}

async fn screen_batch(workflow: &ServiceWorkflow, prefix: &str, count: usize) -> Vec<Case> {
    let mut cases = Vec::with_capacity(count);
    for n in 1..=count {
        let drawing = DrawingRef(format!("uploads/{prefix}-child-{n:02}.png"));
        match workflow.screen(drawing.clone()).await {
            Ok(case) => {
                println!("- {}", describe(&case));
                cases.push(case);
            }
            Err(err) => println!("- {drawing}: screening failed ({err})"),
        }
    }
    cases
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        drawings,
        audit_entries,
        skip_deactivation,
    } = args;

    let directory = Arc::new(seed_directory());
    let workflow = build_workflow(directory.clone(), WorkflowConfig::default(), Duration::ZERO);

    println!("Drawing screening demo");
    println!("\nScreening {drawings} drawing(s)");
    let cases = screen_batch(&workflow, "demo", drawings).await;

    let mut open = cases
        .iter()
        .filter(|case| case.status == CaseStatus::FlaggedForReview);

    println!("\nReviews");
    if let Some(case) = open.next() {
        if let Some(reviewer) = case.reviewer.clone() {
            match workflow.submit_review(
                &case.id,
                &reviewer,
                ReviewOutcome::FollowUpNeeded,
                "Recommend a follow-up conversation with the school counsellor".to_string(),
            ) {
                Ok(resolved) => println!("- {}", describe(&resolved)),
                Err(err) => println!("- review of {} rejected: {err}", case.id),
            }

            let intruder = if reviewer.0 == "assessor1" {
                "assessor2"
            } else {
                "assessor1"
            };
            if let Err(err) = workflow.submit_review(
                &case.id,
                &ReviewerId(intruder.to_string()),
                ReviewOutcome::NoConcern,
                String::new(),
            ) {
                println!("- second review by {intruder} rejected: {err}");
            }
        }
    } else {
        println!("- no flagged cases in this batch");
    }

    println!("\nAdministrative reassignment");
    match open.next() {
        Some(case) => {
            let target = match case.reviewer.as_ref().map(|id| id.0.as_str()) {
                Some("assessor1") => "assessor2",
                _ => "assessor1",
            };
            match workflow.reassign(&case.id, &ReviewerId(target.to_string())) {
                Ok(moved) => println!("- {}", describe(&moved)),
                Err(err) => println!("- reassignment of {} rejected: {err}", case.id),
            }
        }
        None => println!("- nothing left to reassign"),
    }

    if !skip_deactivation {
        println!("\nDeactivating assessor2 and screening two more drawings");
        if let Err(err) =
            directory.set_activity(&ReviewerId("assessor2".to_string()), Activity::Inactive)
        {
            println!("- directory update failed: {err}");
        }
        screen_batch(&workflow, "late", 2).await;
    }

    println!("\nRecent audit trail");
    match workflow.recent_audit_entries(Some(audit_entries)) {
        Ok(entries) => {
            for entry in entries {
                println!(
                    "- {} {}",
                    entry.recorded_at.format("%H:%M:%S%.3f"),
                    entry.message
                );
            }
        }
        Err(err) => println!("- audit unavailable: {err}"),
    }

    Ok(())
}

//! `fill` and `feedback` subcommand handlers.

use std::path::Path;

use tracing::{info, warn};

use jobfill_pipeline::{FeedbackReporter, FillReport, RunOptions, SubmissionFeedback};

use crate::app::{App, AppResult};

/// Run one autofill pass over a browser tab.
pub(crate) async fn fill(app: &App, tab: &str, options: RunOptions, json: bool) -> AppResult<()> {
    let (pipeline, tab) = app.pipeline(tab).await?;
    let result = pipeline.run(&tab, options).await;
    app.shutdown().await;

    match result {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            warn!("Autofill failed: {}", e);
            Err(e.user_message().into())
        }
    }
}

fn print_report(report: &FillReport) {
    println!(
        "Filled {} field(s) across {} frame(s)",
        report.filled, report.frames
    );
    println!(
        "  scraped: {}, from cache: {}, mapped: {}{}",
        report.fields_scraped,
        report.cache_hits,
        report.mapped,
        if report.session_hit { " (session cache)" } else { "" }
    );
    if report.selector_hints > 0 {
        println!("  learned selectors used: {}", report.selector_hints);
    }
    if report.resume_uploads > 0 {
        println!("  résumé uploads: {}", report.resume_uploads);
    }
    if report.dropped_by_cap > 0 {
        println!(
            "  skipped {} education/employment value(s) beyond your profile entries",
            report.dropped_by_cap
        );
    }
    for failure in &report.failed_frames {
        println!("  frame {} failed: {}", failure.frame_id, failure.error);
    }
    if !report.unfilled_profile_keys.is_empty() {
        println!(
            "  add these to your profile to fill more: {}",
            report.unfilled_profile_keys.join(", ")
        );
    }
}

/// Submit a feedback document read from `file`.
pub(crate) async fn feedback(app: &App, file: &Path) -> AppResult<()> {
    let content = tokio::fs::read_to_string(file).await?;
    let feedback: SubmissionFeedback = serde_json::from_str(&content)?;

    let reporter = FeedbackReporter::new(app.coordinator.clone(), app.config.api.feedback_url());
    let learned = reporter.submit(&feedback).await?;
    info!("Feedback accepted for {}", feedback.url);
    println!(
        "Sent {} field(s), {} answer(s) learned",
        feedback.fields.len(),
        learned
    );
    Ok(())
}

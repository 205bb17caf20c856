//! Bulk update command handler.
//!
//! Submits a baseline push as a background job and polls it to completion.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use encfleet_core::{Fleet, JobState};

use crate::cli::{BulkUpdateArgs, GlobalOpts};
use crate::error::CliError;

use super::util;

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

pub async fn handle(
    fleet: &Fleet,
    args: BulkUpdateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let csv = util::read_targets_file(&args.targets)?;
    let accepted = fleet.bulk_update(&csv)?;
    tracing::debug!(job_id = %accepted.job_id, "bulk job submitted");

    let bar = spinner(global.quiet, accepted.message.clone());
    let poll = Duration::from_millis(args.poll_interval_ms.max(10));
    let record = loop {
        tokio::time::sleep(poll).await;
        let record = fleet.job(accepted.job_id)?;
        if record.state == JobState::Completed {
            break record;
        }
    };
    bar.finish_and_clear();

    if !global.quiet {
        eprintln!(
            "Job {}: {} of {} device(s) updated",
            record.id,
            record.updated_count(),
            record.targets.len()
        );
    }
    util::report_outcomes(&record.outcomes, global)
}

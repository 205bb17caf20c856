//! Control template and push command handlers.
//!
//! The device cache lives only as long as the process, so both commands
//! discover first and then elect the control device from that scan.

use encfleet_core::{ControlPreview, Fleet};
use tracing::debug;

use crate::cli::{ControlArgs, GlobalOpts, PushArgs};
use crate::error::CliError;
use crate::output;

use super::util;

fn preview_detail(preview: &ControlPreview) -> String {
    let settings = output::render_json_pretty(&preview.settings)
        .unwrap_or_else(|e| format!("<unrenderable: {e}>"));
    format!(
        "Template v{} from {}\nMerged settings for {}:\n{settings}",
        preview.template_version, preview.source_address, preview.target_id
    )
}

pub async fn handle_control(
    fleet: &Fleet,
    args: ControlArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    fleet
        .discover(util::discover_request(&args.scan, false))
        .await?;
    let preview = fleet.set_control(&args.address, &args.target_id)?;

    let out = output::render_single(global.output(), &preview, preview_detail, |p| {
        p.target_id.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_push(fleet: &Fleet, args: PushArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Reject a bad target list before touching the network.
    let targets = util::read_targets(&args.targets)?;

    fleet
        .discover(util::discover_request(&args.scan, false))
        .await?;
    let preview_id = targets.first().map(|t| t.id.as_str()).unwrap_or_default();
    let preview = fleet.set_control(&args.control, preview_id)?;
    debug!(
        template_version = preview.template_version,
        source = %preview.source_address,
        "template elected for push"
    );

    let report = fleet.push_updates(targets).await?;
    if !global.quiet {
        eprintln!(
            "Pushed template v{} from {} to {} device(s)",
            report.template_version,
            args.control,
            report.results.len()
        );
    }
    util::report_outcomes(&report.results, global)
}

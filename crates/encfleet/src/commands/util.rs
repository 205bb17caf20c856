//! Shared helpers for command handlers.

use std::path::Path;
use std::time::Duration;

use tabled::Tabled;

use encfleet_core::{DeviceTarget, DiscoverRequest, Outcome, parse_targets};

use crate::cli::{GlobalOpts, ScanArgs};
use crate::error::CliError;
use crate::output;

/// Build a discovery request from the scan flags.
pub fn discover_request(scan: &ScanArgs, rescan: bool) -> DiscoverRequest {
    DiscoverRequest {
        subnet: scan.subnet.clone(),
        rescan,
        per_ip_timeout: scan.probe_timeout_ms.map(Duration::from_millis),
        max_concurrent: scan.concurrency,
        settings_timeout: scan.settings_timeout_ms.map(Duration::from_millis),
    }
}

/// Read a target CSV from disk and validate every row.
pub fn read_targets(path: &Path) -> Result<Vec<DeviceTarget>, CliError> {
    let csv = read_targets_file(path)?;
    Ok(parse_targets(&csv)?)
}

/// Read a target CSV from disk without parsing it.
pub fn read_targets_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Validation {
        field: "targets".into(),
        reason: format!("cannot read {}: {e}", path.display()),
    })
}

// ── Outcome rendering ───────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Print per-device outcomes and fail when any device was not updated.
pub fn report_outcomes(outcomes: &[Outcome], global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color());
    let out = output::render_list(
        global.output(),
        outcomes,
        |o| OutcomeRow {
            id: o.id.clone(),
            address: o.address.clone(),
            status: output::status_label(&o.status, color),
            reason: o.status.reason().unwrap_or_default().to_owned(),
        },
        |o| format!("{}\t{}", o.address, o.status.label()),
    )?;
    output::print_output(&out, global.quiet);

    let failed = outcomes.iter().filter(|o| !o.status.is_updated()).count();
    if failed > 0 {
        return Err(CliError::PartialUpdate {
            failed,
            total: outcomes.len(),
        });
    }
    Ok(())
}

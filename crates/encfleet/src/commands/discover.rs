//! Discovery command handler.

use serde::Serialize;
use tabled::Tabled;

use encfleet_core::{DeviceDescriptor, Fleet};

use crate::cli::{DiscoverArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summary + table row ─────────────────────────────────────────────

/// A device without its settings document, for listings.
#[derive(Serialize)]
struct DeviceSummary<'a> {
    id: &'a str,
    address: &'a str,
    name: &'a str,
    settings_read: bool,
    recording_folder: Option<String>,
}

impl<'a> From<&'a DeviceDescriptor> for DeviceSummary<'a> {
    fn from(d: &'a DeviceDescriptor) -> Self {
        let recording_folder = d
            .settings
            .as_ref()
            .and_then(|s| s.identity().ok().flatten())
            .and_then(|identity| identity.primary_folder().map(str::to_owned));
        Self {
            id: &d.id,
            address: &d.address,
            name: &d.name,
            settings_read: d.settings.is_some(),
            recording_folder,
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Settings")]
    settings: String,
    #[tabled(rename = "Recording folder")]
    folder: String,
}

impl From<&DeviceSummary<'_>> for DeviceRow {
    fn from(s: &DeviceSummary<'_>) -> Self {
        Self {
            address: s.address.to_owned(),
            id: s.id.to_owned(),
            settings: if s.settings_read { "read" } else { "unavailable" }.into(),
            folder: s.recording_folder.clone().unwrap_or_default(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(fleet: &Fleet, args: DiscoverArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let response = fleet
        .discover(util::discover_request(&args.scan, args.rescan))
        .await?;

    let out = if args.with_settings {
        output::render_list(
            global.output(),
            &response.devices,
            |d| DeviceRow::from(&DeviceSummary::from(d)),
            |d| d.address.clone(),
        )?
    } else {
        let summaries: Vec<DeviceSummary<'_>> =
            response.devices.iter().map(DeviceSummary::from).collect();
        output::render_list(
            global.output(),
            &summaries,
            |s| DeviceRow::from(s),
            |s| s.address.to_owned(),
        )?
    };
    output::print_output(&out, global.quiet);

    if !global.quiet {
        let scanned_at = response.scanned_at.with_timezone(&chrono::Local);
        eprintln!(
            "{} device(s) on {}, {} {}",
            response.devices.len(),
            response.subnet,
            if response.cached { "cached from" } else { "scanned at" },
            scanned_at.format("%H:%M:%S")
        );
    }
    Ok(())
}

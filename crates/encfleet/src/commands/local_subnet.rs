//! Local subnet command handler.
//!
//! Resolves the default scan subnet from the config without needing device
//! credentials.

use std::net::Ipv4Addr;

use encfleet_core::subnet;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;

    let resolved = match cfg.subnet.as_deref() {
        Some(cidr) => subnet::parse(cidr)?.to_string(),
        None => {
            let host = match cfg.host_address.as_deref() {
                Some(raw) => raw.trim().parse::<Ipv4Addr>().map_err(|e| CliError::Validation {
                    field: "host_address".into(),
                    reason: format!("{raw}: {e}"),
                })?,
                None => subnet::detect_host_address(),
            };
            subnet::local_subnet(host, cfg.prefix_len)?
        }
    };

    let out = output::render_single(global.output(), &resolved, Clone::clone, Clone::clone)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

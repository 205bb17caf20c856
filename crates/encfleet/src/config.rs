//! CLI configuration: thin wrapper around `encfleet_config`.
//!
//! Loads the file named by `--config` (or the platform default) and applies
//! the `GlobalOpts` flag overrides before translating to `FleetConfig`.

use std::path::PathBuf;

use clap::ValueEnum;
use secrecy::SecretString;

use encfleet_core::FleetConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use encfleet_config::{Config, config_path, load_config_from, save_config, store_password};

/// The config file in effect: `--config` when given, else the default path.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply flag overrides.
///
/// Flags take priority over the file and the environment.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&active_path(global))?;

    if let Some(ref host) = global.host_address {
        cfg.host_address = Some(host.clone());
    }
    if let Some(port) = global.port {
        cfg.device_port = port;
    }
    if let Some(ref username) = global.username {
        cfg.username.clone_from(username);
    }
    Ok(cfg)
}

/// Fill `--output` and `--color` from the config's `[defaults]` when
/// neither the flag nor its environment variable was given.
pub fn apply_output_defaults(global: &mut GlobalOpts) -> Result<(), CliError> {
    if global.output.is_some() && global.color.is_some() {
        return Ok(());
    }
    let cfg = load_config_from(&active_path(global))?;
    if global.output.is_none() {
        global.output = Some(parse_default("defaults.output", &cfg.defaults.output)?);
    }
    if global.color.is_none() {
        global.color = Some(parse_default("defaults.color", &cfg.defaults.color)?);
    }
    Ok(())
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Resolve the runtime configuration, including the device password.
pub fn resolve_fleet_config(global: &GlobalOpts) -> Result<FleetConfig, CliError> {
    let cfg = load(global)?;
    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => encfleet_config::resolve_password(&cfg)?,
    };
    Ok(encfleet_config::to_fleet_config(&cfg, password)?)
}

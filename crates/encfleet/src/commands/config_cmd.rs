//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::BufRead;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking the password.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref subnet) = cfg.subnet {
        let _ = writeln!(out, "subnet = \"{subnet}\"");
    }
    if let Some(ref host) = cfg.host_address {
        let _ = writeln!(out, "host_address = \"{host}\"");
    }
    let _ = writeln!(out, "prefix_len = {}", cfg.prefix_len);
    let _ = writeln!(out, "device_port = {}", cfg.device_port);
    let _ = writeln!(out, "username = \"{}\"", cfg.username);
    if cfg.password.is_some() {
        let _ = writeln!(out, "password = \"****\"");
    }
    if let Some(ref env) = cfg.password_env {
        let _ = writeln!(out, "password_env = \"{env}\"");
    }
    let _ = writeln!(out, "keyring = {}", cfg.keyring);

    let _ = writeln!(out);
    let _ = writeln!(out, "[probe]");
    let _ = writeln!(out, "timeout_ms = {}", cfg.probe.timeout_ms);
    let _ = writeln!(out, "concurrency = {}", cfg.probe.concurrency);
    let _ = writeln!(out, "settings_timeout_ms = {}", cfg.probe.settings_timeout_ms);

    let _ = writeln!(out);
    let _ = writeln!(out, "[update]");
    let _ = writeln!(out, "concurrency = {}", cfg.update.concurrency);
    let _ = writeln!(out, "request_timeout_secs = {}", cfg.update.request_timeout_secs);

    let _ = writeln!(out);
    let _ = writeln!(out, "[retry]");
    let _ = writeln!(out, "attempts = {}", cfg.retry.attempts);
    let _ = writeln!(out, "delay_ms = {}", cfg.retry.delay_ms);

    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = write!(out, "color = \"{}\"", cfg.defaults.color);

    out
}

/// Read one line from stdin, without the trailing newline.
fn read_secret_line() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let secret = line.trim_end_matches(['\r', '\n']).to_owned();
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "no password read from stdin".into(),
        });
    }
    Ok(secret)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::active_path(global).display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force, subnet } => {
            let path = config::active_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            if let Some(ref cidr) = subnet {
                encfleet_core::subnet::parse(cidr)?;
            }

            let cfg = Config {
                subnet,
                host_address: global.host_address.clone(),
                username: global
                    .username
                    .clone()
                    .unwrap_or_else(|| Config::default().username),
                device_port: global.port.unwrap_or(Config::default().device_port),
                ..Config::default()
            };
            config::save_config(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Wrote {}", path.display());
                eprintln!("Store the device password with: encfleet config set-password");
            }
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load(global)?;
            if !global.quiet {
                eprintln!("Reading password for '{}' from stdin", cfg.username);
            }
            let secret = read_secret_line()?;
            config::store_password(&cfg.username, &secret)?;
            if !global.quiet {
                eprintln!("Password for '{}' stored in system keyring", cfg.username);
            }
            Ok(())
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use encfleet_config::ConfigError;
use encfleet_core::{CoreError, MissingState};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Network ──────────────────────────────────────────────────────

    #[error("Device unreachable: {message}")]
    #[diagnostic(
        code(encfleet::connection_failed),
        help(
            "Check that the device is powered and on the scanned subnet.\n\
             Try a longer timeout: encfleet discover --probe-timeout-ms 3000"
        )
    )]
    ConnectionFailed { message: String },

    #[error("Unexpected device response: {message}")]
    #[diagnostic(
        code(encfleet::protocol),
        help("The device answered, but not with the expected API response. Is it an encoder?")
    )]
    Protocol { message: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Device login rejected: {message}")]
    #[diagnostic(
        code(encfleet::auth_failed),
        help(
            "Verify the device username and password.\n\
             Run: encfleet config set-password"
        )
    )]
    AuthFailed { message: String },

    #[error("No device password configured for user '{username}'")]
    #[diagnostic(
        code(encfleet::no_credentials),
        help(
            "Store one with: encfleet config set-password\n\
             Or set the ENCFLEET_PASSWORD environment variable."
        )
    )]
    NoCredentials { username: String },

    // ── State ────────────────────────────────────────────────────────

    #[error("{what}")]
    #[diagnostic(code(encfleet::not_found), help("{hint}"))]
    NotFound { what: String, hint: String },

    // ── Batches ──────────────────────────────────────────────────────

    #[error("{failed} of {total} device(s) were not updated")]
    #[diagnostic(
        code(encfleet::partial_update),
        help("Re-run with -v to see each device's failure, or retry the failed targets.")
    )]
    PartialUpdate { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(encfleet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(encfleet::config_exists),
        help("Pass --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(encfleet::config),
        help("Check the file shown by: encfleet config path")
    )]
    Config(ConfigError),

    #[error("Internal error: {0}")]
    #[diagnostic(code(encfleet::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(encfleet::json))]
    Json(#[from] serde_json::Error),

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(encfleet::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::PartialUpdate { .. } => exit_code::PARTIAL,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSubnet { subnet, reason } => CliError::Validation {
                field: "subnet".into(),
                reason: format!("{subnet}: {reason}"),
            },

            CoreError::InvalidInput { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::TransientNetwork { message } => CliError::ConnectionFailed { message },

            CoreError::AuthFailure { message } => CliError::AuthFailed { message },

            CoreError::ProtocolFailure { message } => CliError::Protocol { message },

            CoreError::StateFailure(missing) => {
                let hint = match &missing {
                    MissingState::ScanCache | MissingState::Device { .. } => {
                        "Run: encfleet discover --rescan to see the devices on the subnet"
                    }
                    MissingState::DeviceSettings { .. } => {
                        "The device answered the probe but its settings could not be read.\n\
                         Check its credentials, then rescan."
                    }
                    MissingState::ControlTemplate => {
                        "Elect a template first: encfleet control <address> <target-id>"
                    }
                    MissingState::Job { .. } => "Bulk jobs only live as long as the process.",
                };
                CliError::NotFound {
                    what: missing.to_string(),
                    hint: hint.into(),
                }
            }

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { username } => CliError::NoCredentials { username },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

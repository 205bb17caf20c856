// ── Core error types ──
//
// Operator-facing errors from encfleet-core. Consumers never see HTTP
// statuses or JSON parse failures directly: the `From<encfleet_api::Error>`
// impl folds transport-layer errors into the fleet taxonomy.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Coarse classification of a [`CoreError`], used for logging and for the
/// CLI's exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    InvalidInput,
    TransientNetwork,
    AuthFailure,
    ProtocolFailure,
    StateFailure,
    Config,
    Internal,
}

/// Prior state an operation needed but did not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingState {
    /// No discovery has completed yet.
    ScanCache,
    /// The address is not in the last scan.
    Device { address: String },
    /// The device was discovered but its settings could not be read.
    DeviceSettings { address: String },
    /// No control template has been elected.
    ControlTemplate,
    /// No bulk job with this id exists.
    Job { id: String },
}

impl fmt::Display for MissingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScanCache => f.write_str("no discovery results cached; run a scan first"),
            Self::Device { address } => write!(f, "device {address} is not in the last scan"),
            Self::DeviceSettings { address } => {
                write!(f, "settings for device {address} were not retrieved")
            }
            Self::ControlTemplate => f.write_str("no control template has been set"),
            Self::Job { id } => write!(f, "no bulk job with id {id}"),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("Invalid subnet '{subnet}': {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    // ── Per-device errors ────────────────────────────────────────────
    #[error("Network error: {message}")]
    TransientNetwork { message: String },

    #[error("Authentication failed: {message}")]
    AuthFailure { message: String },

    #[error("Unexpected device response: {message}")]
    ProtocolFailure { message: String },

    // ── State errors ─────────────────────────────────────────────────
    #[error("{0}")]
    StateFailure(MissingState),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSubnet { .. } | Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::TransientNetwork { .. } => ErrorKind::TransientNetwork,
            Self::AuthFailure { .. } => ErrorKind::AuthFailure,
            Self::ProtocolFailure { .. } => ErrorKind::ProtocolFailure,
            Self::StateFailure(_) => ErrorKind::StateFailure,
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<encfleet_api::Error> for CoreError {
    fn from(err: encfleet_api::Error) -> Self {
        if err.is_transient() {
            return CoreError::TransientNetwork {
                message: err.to_string(),
            };
        }
        match err {
            encfleet_api::Error::Authentication { message } => CoreError::AuthFailure { message },
            encfleet_api::Error::InvalidUrl(e) => CoreError::InvalidInput {
                message: format!("invalid device address: {e}"),
            },
            encfleet_api::Error::ClientBuild(message) => CoreError::Config { message },
            encfleet_api::Error::Deserialization { message, body: _ } => {
                CoreError::ProtocolFailure { message }
            }
            other @ (encfleet_api::Error::Http { .. }
            | encfleet_api::Error::Rejected { .. }
            | encfleet_api::Error::ReportSectionMissing { .. }
            | encfleet_api::Error::Transport(_)
            | encfleet_api::Error::Timeout { .. }) => CoreError::ProtocolFailure {
                message: other.to_string(),
            },
        }
    }
}

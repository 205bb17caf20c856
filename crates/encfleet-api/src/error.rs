use thiserror::Error;

/// Top-level error type for the `encfleet-api` crate.
///
/// Covers every failure mode of the device `usapi` surface: login,
/// transport, unexpected HTTP statuses, non-zero result codes and
/// malformed payloads. `encfleet-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The device explicitly rejected the login (bad credentials, HTTP 401/403,
    /// or a non-zero `result` code on the login call).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, reset, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded its explicit deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Device API ──────────────────────────────────────────────────
    /// Non-success HTTP status other than an auth rejection.
    #[error("Device API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    /// The device answered with a non-zero `result` code.
    #[error("Device rejected `{method}` with result {result}")]
    Rejected { method: &'static str, result: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The HTML status report carried no section with the requested heading.
    #[error("Report section '{section}' not found")]
    ReportSectionMissing { section: String },
}

impl Error {
    /// Returns `true` for connection-level failures worth retrying:
    /// refused or reset connections, timeouts, and requests that never
    /// produced a response.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if the device explicitly refused the credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_transient());
    }

    #[test]
    fn rejections_are_not_transient() {
        let auth = Error::Authentication {
            message: "bad password".into(),
        };
        assert!(!auth.is_transient());
        assert!(auth.is_auth_rejection());

        let rejected = Error::Rejected {
            method: "import-settings",
            result: "5".into(),
        };
        assert!(!rejected.is_transient());
        assert!(!rejected.is_auth_rejection());
    }

    #[test]
    fn malformed_payloads_are_not_transient() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(!err.is_transient());
    }
}

// ── Runtime fleet configuration ──
//
// Describes how to reach the fleet and how hard to push on it. Carries
// credential data and tuning knobs, but never touches disk: the CLI builds
// a `FleetConfig` from `encfleet-config` and hands it in.

use std::net::Ipv4Addr;
use std::time::Duration;

use encfleet_api::{Credentials, RetryPolicy};
use secrecy::SecretString;

/// Account every appliance ships with.
pub const DEFAULT_USERNAME: &str = "Admin";

/// Prefix length used when the scan subnet is derived from the host address.
pub const DEFAULT_PREFIX_LEN: u8 = 23;

#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Login used for every device.
    pub credentials: Credentials,
    /// HTTP port of the device API.
    pub device_port: u16,
    /// Explicit scan subnet. When unset it is derived from the host address.
    pub subnet: Option<String>,
    /// Explicit local host address. When unset it is detected at startup.
    pub host_address: Option<Ipv4Addr>,
    /// Prefix length for the derived subnet.
    pub prefix_len: u8,
    /// Per-address liveness probe deadline.
    pub probe_timeout: Duration,
    /// Probes in flight at once.
    pub probe_concurrency: usize,
    /// Deadline for login plus settings retrieval per discovered device.
    pub settings_timeout: Duration,
    /// Devices updated at once by a bulk push.
    pub update_concurrency: usize,
    /// Default per-request deadline for login and push calls.
    pub request_timeout: Duration,
    /// Retry policy for login and push.
    pub retry: RetryPolicy,
}

impl FleetConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::new(DEFAULT_USERNAME, SecretString::from(String::new())),
            device_port: 80,
            subnet: None,
            host_address: None,
            prefix_len: DEFAULT_PREFIX_LEN,
            probe_timeout: Duration::from_secs(1),
            probe_concurrency: 50,
            settings_timeout: Duration::from_secs(2),
            update_concurrency: 10,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

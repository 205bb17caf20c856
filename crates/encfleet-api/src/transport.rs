// Shared transport configuration for building reqwest::Client instances.
//
// One client is built per fleet operation and shared by every per-device
// `DeviceClient`, so connection pools and TLS state are not rebuilt for each
// of the hundreds of addresses a subnet scan touches.

use std::time::Duration;

use reqwest::redirect::Policy;

use crate::error::Error;

const USER_AGENT: &str = concat!("encfleet/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Default per-request deadline. Individual device clients may
    /// override it with [`DeviceClient::with_timeout`](crate::DeviceClient::with_timeout).
    pub timeout: Duration,
    /// Deadline for establishing the TCP connection.
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            user_agent: USER_AGENT.into(),
        }
    }
}

impl TransportConfig {
    /// Set the default per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Redirects are never followed: the devices answer `usapi` calls
    /// directly, and a redirect means the address is not an appliance.
    /// Cookies are not stored in a jar; login folds them into an explicit
    /// per-operation [`Session`](crate::Session) instead.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}

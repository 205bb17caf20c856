// encfleet-api: Async Rust client for the encoder appliance `usapi` endpoint
//
// Every device exposes a single `/usapi?method=...` endpoint. This crate
// wraps it with typed login, liveness, settings and report calls, plus the
// explicit retry policy the fleet layer threads through each call site.

pub mod auth;
pub mod client;
pub mod error;
pub mod report;
pub mod retry;
pub mod session;
pub mod settings;
pub mod system;
pub mod transport;

pub use auth::{Credentials, password_digest};
pub use client::{DeviceClient, ResultCode, device_base_url};
pub use error::Error;
pub use retry::RetryPolicy;
pub use session::Session;
pub use transport::TransportConfig;

// ── Settings retrieval ──
//
// Logs into a discovered device and reads its configuration. Two sources
// produce the same document shape: the direct `get-settings` query, and
// the `SETTINGS` block embedded in the HTML status report. The fetcher
// tries them in order and settles for an empty document when none works.

use std::future::Future;
use std::time::Duration;

use encfleet_api::{Credentials, DeviceClient, RetryPolicy, Session};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::SettingsDocument;

/// A way of reading a device's settings once logged in.
pub trait SettingsSource {
    fn read(
        &self,
        client: &DeviceClient,
        session: &Session,
    ) -> impl Future<Output = Result<Map<String, Value>, encfleet_api::Error>> + Send;
}

/// `GET /usapi?method=get-settings`.
#[derive(Debug, Clone, Copy)]
pub struct DirectQuery;

impl SettingsSource for DirectQuery {
    async fn read(
        &self,
        client: &DeviceClient,
        session: &Session,
    ) -> Result<Map<String, Value>, encfleet_api::Error> {
        client.get_settings(session).await
    }
}

/// `GET /usapi?method=get-report`, then the `SETTINGS` section.
#[derive(Debug, Clone, Copy)]
pub struct ReportExtraction;

impl SettingsSource for ReportExtraction {
    async fn read(
        &self,
        client: &DeviceClient,
        session: &Session,
    ) -> Result<Map<String, Value>, encfleet_api::Error> {
        client.get_report_settings(session).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsStrategy {
    Direct,
    Report,
}

impl SettingsStrategy {
    pub fn name(self) -> &'static str {
        match self {
            Self::Direct => "get-settings",
            Self::Report => "get-report",
        }
    }
}

impl SettingsSource for SettingsStrategy {
    async fn read(
        &self,
        client: &DeviceClient,
        session: &Session,
    ) -> Result<Map<String, Value>, encfleet_api::Error> {
        match self {
            Self::Direct => DirectQuery.read(client, session).await,
            Self::Report => ReportExtraction.read(client, session).await,
        }
    }
}

/// Reads settings from discovered devices.
#[derive(Debug, Clone)]
pub struct SettingsFetcher {
    http: reqwest::Client,
    port: u16,
    credentials: Credentials,
    retry: RetryPolicy,
    timeout: Duration,
    strategies: Vec<SettingsStrategy>,
}

impl SettingsFetcher {
    /// Direct query first, report extraction as the fallback.
    pub fn new(
        http: reqwest::Client,
        port: u16,
        credentials: Credentials,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            port,
            credentials,
            retry,
            timeout,
            strategies: vec![SettingsStrategy::Direct, SettingsStrategy::Report],
        }
    }

    pub fn with_strategies(mut self, strategies: Vec<SettingsStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Settings of the device at `address`, or an empty document when
    /// login or every strategy failed. Failures are logged, never returned.
    pub async fn fetch(&self, address: &str) -> SettingsDocument {
        match self.try_fetch(address).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(%address, error = %e, kind = %e.kind(), "settings unavailable");
                SettingsDocument::new()
            }
        }
    }

    /// Like [`fetch`](Self::fetch) but surfaces the failure.
    pub async fn try_fetch(&self, address: &str) -> Result<SettingsDocument, CoreError> {
        let client =
            DeviceClient::new(self.http.clone(), address, self.port)?.with_timeout(self.timeout);
        let session = client
            .login_with_retry(&self.credentials, &self.retry)
            .await?;

        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.read(&client, &session).await {
                Ok(map) => {
                    debug!(%address, strategy = strategy.name(), keys = map.len(), "settings read");
                    return Ok(SettingsDocument::from_map(map));
                }
                Err(e) => {
                    debug!(%address, strategy = strategy.name(), error = %e, "settings strategy failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map_or_else(
            || CoreError::Config {
                message: "no settings strategies configured".into(),
            },
            CoreError::from,
        ))
    }
}

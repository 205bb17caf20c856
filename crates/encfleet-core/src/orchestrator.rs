// ── Bulk update orchestration ──
//
// Fans authenticate → merge → push out over many targets with a cap on how
// many devices are worked on at once, then collects one outcome per target.
// A target's failure is recorded in its own outcome and never reaches the
// others.

use std::sync::Arc;
use std::time::Duration;

use encfleet_api::{Credentials, DeviceClient, RetryPolicy};
use tracing::{info, warn};

use crate::defaults::default_settings;
use crate::merge::merge;
use crate::model::{DeviceTarget, Outcome, OutcomeStatus, SettingsDocument};
use crate::pool::run_bounded;
use crate::store::TemplateSnapshot;

/// Where a batch gets each target's settings from.
#[derive(Debug, Clone)]
pub enum SettingsPlan {
    /// The vendor default document for the target's id.
    Defaults,
    /// A control template snapshot merged onto the target's defaults. The
    /// snapshot is fixed for the whole batch.
    Template(Arc<TemplateSnapshot>),
}

impl SettingsPlan {
    pub fn template_version(&self) -> Option<u64> {
        match self {
            Self::Defaults => None,
            Self::Template(snapshot) => Some(snapshot.version),
        }
    }

    pub fn settings_for(&self, target_id: &str) -> SettingsDocument {
        match self {
            Self::Defaults => default_settings(target_id),
            Self::Template(snapshot) => merge(target_id, &snapshot.settings),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BulkUpdater {
    http: reqwest::Client,
    port: u16,
    credentials: Credentials,
    retry: RetryPolicy,
    timeout: Duration,
    max_concurrent: usize,
}

impl BulkUpdater {
    pub fn new(
        http: reqwest::Client,
        port: u16,
        credentials: Credentials,
        retry: RetryPolicy,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            http,
            port,
            credentials,
            retry,
            timeout,
            max_concurrent,
        }
    }

    /// Update every target and return their outcomes in input order.
    pub async fn run(&self, targets: Vec<DeviceTarget>, plan: SettingsPlan) -> Vec<Outcome> {
        let total = targets.len();
        info!(
            targets = total,
            max_concurrent = self.max_concurrent,
            template_version = ?plan.template_version(),
            "bulk update started"
        );

        let plan = Arc::new(plan);
        let fallback = targets.clone();
        let results = run_bounded(targets, self.max_concurrent, |target| {
            let updater = self.clone();
            let plan = Arc::clone(&plan);
            async move { updater.update_one(&target, &plan).await }
        })
        .await;

        let outcomes: Vec<Outcome> = results
            .into_iter()
            .zip(&fallback)
            .map(|(result, target)| {
                result.unwrap_or_else(|| {
                    Outcome::new(
                        target,
                        OutcomeStatus::PushFailed {
                            reason: "update task aborted".into(),
                        },
                    )
                })
            })
            .collect();

        let updated = outcomes.iter().filter(|o| o.status.is_updated()).count();
        info!(targets = total, updated, failed = total - updated, "bulk update finished");
        outcomes
    }

    /// Authenticate, build the target's settings, push them.
    pub async fn update_one(&self, target: &DeviceTarget, plan: &SettingsPlan) -> Outcome {
        let device_id = target.id.as_str();
        let address = target.address.as_str();

        let client = match DeviceClient::new(self.http.clone(), address, self.port) {
            Ok(client) => client.with_timeout(self.timeout),
            Err(e) => {
                warn!(device_id, address, error = %e, "invalid target address");
                return Outcome::new(
                    target,
                    OutcomeStatus::LoginFailed {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let session = match client.login_with_retry(&self.credentials, &self.retry).await {
            Ok(session) => session,
            Err(e) => {
                warn!(device_id, address, error = %e, "login failed");
                return Outcome::new(
                    target,
                    OutcomeStatus::LoginFailed {
                        reason: e.to_string(),
                    },
                );
            }
        };

        let settings = plan.settings_for(device_id);
        match client
            .import_settings_with_retry(&session, settings.as_map(), &self.retry)
            .await
        {
            Ok(_) => {
                info!(device_id, address, "settings imported");
                Outcome::new(target, OutcomeStatus::Updated)
            }
            Err(e) => {
                warn!(device_id, address, error = %e, "import-settings failed");
                Outcome::new(
                    target,
                    OutcomeStatus::PushFailed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }
}

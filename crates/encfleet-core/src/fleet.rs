// ── Fleet facade ──
//
// The operator-facing entry point. Owns the shared HTTP client and the
// process-wide store, and wires the prober, settings fetcher, merge engine
// and bulk updater together behind the discover / set-control / push
// operations.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use encfleet_api::TransportConfig;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FleetConfig;
use crate::error::{CoreError, MissingState};
use crate::fetch::SettingsFetcher;
use crate::merge::merge;
use crate::model::{DeviceDescriptor, DeviceTarget, JobId, JobRecord, Outcome, SettingsDocument};
use crate::orchestrator::{BulkUpdater, SettingsPlan};
use crate::pool::run_bounded;
use crate::probe::{HttpProbe, Prober};
use crate::store::{FleetStore, ScanSnapshot};
use crate::subnet;
use crate::targets::parse_targets;

// ── Requests and responses ───────────────────────────────────────────

/// Parameters of one discovery. Unset fields fall back to the fleet
/// configuration.
#[derive(Debug, Clone, Default)]
pub struct DiscoverRequest {
    /// CIDR to scan; the local subnet when unset.
    pub subnet: Option<String>,
    /// Scan even when a cached result for the subnet exists.
    pub rescan: bool,
    pub per_ip_timeout: Option<Duration>,
    pub max_concurrent: Option<usize>,
    pub settings_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResponse {
    pub subnet: String,
    pub scanned_at: DateTime<Utc>,
    /// `true` when the result came from the cache without probing.
    pub cached: bool,
    pub devices: Vec<DeviceDescriptor>,
}

impl DiscoverResponse {
    fn from_snapshot(snapshot: &ScanSnapshot, cached: bool) -> Self {
        Self {
            subnet: snapshot.subnet.clone(),
            scanned_at: snapshot.scanned_at,
            cached,
            devices: snapshot.devices.clone(),
        }
    }
}

/// What `target_id` would receive under the newly elected template.
#[derive(Debug, Clone, Serialize)]
pub struct ControlPreview {
    pub template_version: u64,
    pub source_address: String,
    pub target_id: String,
    pub settings: SettingsDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobAccepted {
    pub job_id: JobId,
    pub targets: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub template_version: u64,
    pub results: Vec<Outcome>,
}

// ── Fleet ────────────────────────────────────────────────────────────

/// Cheaply cloneable handle to the fleet manager.
#[derive(Clone)]
pub struct Fleet {
    inner: Arc<FleetInner>,
}

struct FleetInner {
    config: FleetConfig,
    store: FleetStore,
    http: reqwest::Client,
    local_subnet: String,
}

impl Fleet {
    /// Build the shared HTTP client and resolve the local subnet.
    ///
    /// The subnet comes from `config.subnet` when set, otherwise from the
    /// host address (configured or detected) at `config.prefix_len`.
    pub fn new(config: FleetConfig) -> Result<Self, CoreError> {
        let http = TransportConfig::default()
            .with_timeout(config.request_timeout)
            .build_client()?;

        let local_subnet = match &config.subnet {
            Some(cidr) => subnet::parse(cidr)?.to_string(),
            None => {
                let host = config
                    .host_address
                    .unwrap_or_else(subnet::detect_host_address);
                subnet::local_subnet(host, config.prefix_len)?
            }
        };
        debug!(%local_subnet, "fleet initialised");

        Ok(Self {
            inner: Arc::new(FleetInner {
                config,
                store: FleetStore::new(),
                http,
                local_subnet,
            }),
        })
    }

    pub fn config(&self) -> &FleetConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &FleetStore {
        &self.inner.store
    }

    /// The subnet scanned when a discovery names none.
    pub fn local_subnet(&self) -> &str {
        &self.inner.local_subnet
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Find the appliances on a subnet and read their settings.
    ///
    /// Returns the cached scan of the same subnet unless `rescan` is set,
    /// even when that scan found nothing. A fresh scan replaces the cache.
    pub async fn discover(&self, request: DiscoverRequest) -> Result<DiscoverResponse, CoreError> {
        let config = &self.inner.config;
        let net = subnet::parse(request.subnet.as_deref().unwrap_or(self.local_subnet()))?;
        let subnet_key = net.to_string();

        if !request.rescan {
            if let Some(cached) = self.inner.store.read_scan() {
                if cached.subnet == subnet_key {
                    debug!(subnet = %subnet_key, devices = cached.devices.len(), "serving cached scan");
                    return Ok(DiscoverResponse::from_snapshot(&cached, true));
                }
            }
        }

        let per_ip_timeout = request.per_ip_timeout.unwrap_or(config.probe_timeout);
        let max_concurrent = request.max_concurrent.unwrap_or(config.probe_concurrency);
        let settings_timeout = request.settings_timeout.unwrap_or(config.settings_timeout);

        info!(subnet = %subnet_key, max_concurrent, "scanning subnet");
        let candidates: Vec<Ipv4Addr> = net.hosts().collect();
        let probe = HttpProbe::new(self.inner.http.clone(), config.device_port, per_ip_timeout);
        let present = Prober::new(probe, max_concurrent).scan(candidates).await;

        let fetcher = SettingsFetcher::new(
            self.inner.http.clone(),
            config.device_port,
            config.credentials.clone(),
            config.retry,
            settings_timeout,
        );
        let devices: Vec<DeviceDescriptor> = run_bounded(present, max_concurrent, |address| {
            let fetcher = fetcher.clone();
            async move {
                let address = address.to_string();
                let settings = fetcher.fetch(&address).await;
                DeviceDescriptor::from_settings(address, settings)
            }
        })
        .await
        .into_iter()
        .flatten()
        .collect();

        info!(
            subnet = %subnet_key,
            devices = devices.len(),
            with_settings = devices.iter().filter(|d| d.settings.is_some()).count(),
            "discovery finished"
        );

        let snapshot = self.inner.store.replace_scan(ScanSnapshot {
            subnet: subnet_key,
            scanned_at: Utc::now(),
            devices,
        });
        Ok(DiscoverResponse::from_snapshot(&snapshot, false))
    }

    // ── Control template ─────────────────────────────────────────────

    /// Elect the cached settings of the device at `address` as the control
    /// template and preview what `target_id` would receive.
    pub fn set_control(&self, address: &str, target_id: &str) -> Result<ControlPreview, CoreError> {
        let scan = self
            .inner
            .store
            .read_scan()
            .filter(|s| !s.devices.is_empty())
            .ok_or(CoreError::StateFailure(MissingState::ScanCache))?;
        let device = scan.device(address).ok_or_else(|| {
            CoreError::StateFailure(MissingState::Device {
                address: address.to_owned(),
            })
        })?;
        let settings = device.settings.clone().ok_or_else(|| {
            CoreError::StateFailure(MissingState::DeviceSettings {
                address: address.to_owned(),
            })
        })?;

        let template = self.inner.store.set_template(address, settings);
        info!(
            address,
            device_id = %device.id,
            version = template.version,
            "control template elected"
        );

        Ok(ControlPreview {
            template_version: template.version,
            source_address: template.source_address.clone(),
            target_id: target_id.to_owned(),
            settings: merge(target_id, &template.settings),
        })
    }

    // ── Bulk updates ─────────────────────────────────────────────────

    /// Submit a batch that pushes each listed device its default settings.
    ///
    /// The list is validated up front; the batch then runs in the
    /// background and its outcomes are available through [`job`](Self::job).
    /// Must be called from within a tokio runtime.
    pub fn bulk_update(&self, csv: &str) -> Result<JobAccepted, CoreError> {
        let targets = parse_targets(csv)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("bulk update needs a tokio runtime: {e}")))?;

        let job_id = JobId::new();
        let plan = SettingsPlan::Defaults;
        let count = targets.len();
        self.inner
            .store
            .jobs()
            .insert(job_id, targets.clone(), plan.template_version());

        let updater = self.updater();
        let fleet = self.clone();
        runtime.spawn(async move {
            let outcomes = updater.run(targets, plan).await;
            if !fleet.inner.store.jobs().complete(job_id, outcomes) {
                warn!(%job_id, "finished job vanished from the job table");
            }
            info!(%job_id, "bulk job completed");
        });

        info!(%job_id, targets = count, "bulk job accepted");
        Ok(JobAccepted {
            job_id,
            targets: count,
            message: format!("Bulk update of {count} device(s) started"),
        })
    }

    /// Push the current control template, merged per target, to every
    /// target and wait for all outcomes.
    ///
    /// The template is read once before the first device is contacted; a
    /// template elected while the batch runs does not affect it.
    pub async fn push_updates(&self, targets: Vec<DeviceTarget>) -> Result<PushReport, CoreError> {
        let template = self
            .inner
            .store
            .read_template()
            .ok_or(CoreError::StateFailure(MissingState::ControlTemplate))?;
        let template_version = template.version;

        let results = self
            .updater()
            .run(targets, SettingsPlan::Template(template))
            .await;
        Ok(PushReport {
            template_version,
            results,
        })
    }

    /// Current record of a submitted bulk job.
    pub fn job(&self, id: JobId) -> Result<JobRecord, CoreError> {
        self.inner.store.jobs().get(id).ok_or_else(|| {
            CoreError::StateFailure(MissingState::Job { id: id.to_string() })
        })
    }

    fn updater(&self) -> BulkUpdater {
        let config = &self.inner.config;
        BulkUpdater::new(
            self.inner.http.clone(),
            config.device_port,
            config.credentials.clone(),
            config.retry,
            config.request_timeout,
            config.update_concurrency,
        )
    }
}

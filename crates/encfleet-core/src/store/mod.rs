// ── Process-wide fleet state ──
//
// Two singletons (the last scan and the active control template) plus the
// bulk job table. Each singleton is an `ArcSwapOption`: a write publishes a
// complete new value in one pointer swap, and readers keep whatever `Arc`
// they loaded for as long as they need it. Nothing is ever edited in place.

mod jobs;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{DeviceDescriptor, SettingsDocument};

pub use jobs::JobTable;

/// Result of one completed discovery.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    pub subnet: String,
    pub scanned_at: DateTime<Utc>,
    pub devices: Vec<DeviceDescriptor>,
}

impl ScanSnapshot {
    pub fn device(&self, address: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.address == address)
    }
}

/// An elected control template. `version` increases with every election.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSnapshot {
    pub version: u64,
    pub source_address: String,
    pub elected_at: DateTime<Utc>,
    pub settings: SettingsDocument,
}

#[derive(Default)]
pub struct FleetStore {
    scan: ArcSwapOption<ScanSnapshot>,
    template: ArcSwapOption<TemplateSnapshot>,
    jobs: JobTable,
}

impl FleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scan cache ───────────────────────────────────────────────────

    pub fn replace_scan(&self, snapshot: ScanSnapshot) -> Arc<ScanSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.scan.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    pub fn read_scan(&self) -> Option<Arc<ScanSnapshot>> {
        self.scan.load_full()
    }

    // ── Control template ─────────────────────────────────────────────

    /// Publish `settings` as the control template and return the new
    /// snapshot with its version.
    pub fn set_template(
        &self,
        source_address: impl Into<String>,
        settings: SettingsDocument,
    ) -> Arc<TemplateSnapshot> {
        let source_address = source_address.into();
        let elected_at = Utc::now();
        let mut published = None;
        self.template.rcu(|current| {
            let next = Arc::new(TemplateSnapshot {
                version: current.as_ref().map_or(1, |t| t.version + 1),
                source_address: source_address.clone(),
                elected_at,
                settings: settings.clone(),
            });
            published = Some(Arc::clone(&next));
            Some(next)
        });
        let Some(snapshot) = published else {
            unreachable!("rcu runs its update at least once");
        };
        snapshot
    }

    pub fn read_template(&self) -> Option<Arc<TemplateSnapshot>> {
        self.template.load_full()
    }

    // ── Jobs ─────────────────────────────────────────────────────────

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }
}

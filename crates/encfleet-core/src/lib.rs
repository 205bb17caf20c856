// encfleet-core: discovery, settings merge and bulk push for encoder fleets.

pub mod config;
pub mod defaults;
pub mod error;
pub mod fetch;
pub mod fleet;
pub mod merge;
pub mod model;
pub mod orchestrator;
mod pool;
pub mod probe;
pub mod store;
pub mod subnet;
pub mod targets;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_PREFIX_LEN, DEFAULT_USERNAME, FleetConfig};
pub use defaults::default_settings;
pub use error::{CoreError, ErrorKind, MissingState};
pub use fetch::{SettingsFetcher, SettingsSource, SettingsStrategy};
pub use fleet::{
    ControlPreview, DiscoverRequest, DiscoverResponse, Fleet, JobAccepted, PushReport,
};
pub use merge::merge;
pub use orchestrator::{BulkUpdater, SettingsPlan};
pub use probe::{HttpProbe, LivenessProbe, Prober};
pub use store::{FleetStore, ScanSnapshot, TemplateSnapshot};
pub use targets::parse_targets;

pub use model::{
    DeviceDescriptor, DeviceTarget, IdentitySubtree, JobId, JobRecord, JobState, Outcome,
    OutcomeStatus, RecordingChannel, SettingsDocument,
};

// Re-exported so callers can build a `FleetConfig` without a direct
// dependency on the api crate.
pub use encfleet_api::{Credentials, RetryPolicy};

// ── Domain model ──

pub mod device;
pub mod job;
pub mod settings;

pub use device::{DeviceDescriptor, DeviceTarget};
pub use job::{JobId, JobRecord, JobState, Outcome, OutcomeStatus};
pub use settings::{
    IDENTITY_KEYS, IdentitySubtree, RecordingChannel, SettingsDocument, is_identity_key,
};

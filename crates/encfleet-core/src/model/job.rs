// ── Bulk jobs and per-device outcomes ──

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::device::DeviceTarget;

/// Identifier handed back when a bulk update is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Result of one device's authenticate, merge and push sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Updated,
    LoginFailed { reason: String },
    PushFailed { reason: String },
}

impl OutcomeStatus {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::LoginFailed { .. } => "login-failed",
            Self::PushFailed { .. } => "push-failed",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Updated => None,
            Self::LoginFailed { reason } | Self::PushFailed { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub address: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn new(target: &DeviceTarget, status: OutcomeStatus) -> Self {
        Self {
            id: target.id.clone(),
            address: target.address.clone(),
            status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
}

/// Everything known about a submitted bulk update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Version of the control template the batch used, `None` for defaults.
    pub template_version: Option<u64>,
    pub targets: Vec<DeviceTarget>,
    /// Filled in when the batch completes, in target order.
    pub outcomes: Vec<Outcome>,
}

impl JobRecord {
    pub fn updated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_updated()).count()
    }
}

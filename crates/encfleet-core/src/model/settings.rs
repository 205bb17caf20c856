// ── Settings document ──
//
// An ordered, otherwise opaque key/value tree. Only the identity subtree
// (the recording channels whose folder and file names embed the device id)
// has a typed view; every other key is passed through untouched so vendor
// fields this crate does not know about survive a round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Top-level keys derived from the device id. A template never overwrites
/// these on another device.
pub const IDENTITY_KEYS: &[&str] = &["rec-channels"];

pub fn is_identity_key(key: &str) -> bool {
    IDENTITY_KEYS.contains(&key)
}

/// A device configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsDocument(Map<String, Value>);

impl SettingsDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The device's configured name, if it has a non-blank one.
    pub fn name(&self) -> Option<&str> {
        self.0
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Copy of the document without its identity keys.
    pub fn without_identity(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(key, _)| !is_identity_key(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Typed, validated view of the identity subtree. `Ok(None)` when the
    /// document carries none.
    pub fn identity(&self) -> Result<Option<IdentitySubtree>, CoreError> {
        IdentitySubtree::extract(self)
    }
}

impl From<Map<String, Value>> for SettingsDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ── Identity subtree ─────────────────────────────────────────────────

/// One entry of `rec-channels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordingChannel {
    pub id: u32,
    pub dir_name: String,
    pub prefix_name: String,
    /// Vendor fields with no meaning to the fleet (`type`, `time-unit`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySubtree {
    pub rec_channels: Vec<RecordingChannel>,
}

impl IdentitySubtree {
    pub fn extract(doc: &SettingsDocument) -> Result<Option<Self>, CoreError> {
        let Some(raw) = doc.get("rec-channels") else {
            return Ok(None);
        };
        let rec_channels: Vec<RecordingChannel> =
            serde_json::from_value(raw.clone()).map_err(|e| CoreError::ProtocolFailure {
                message: format!("malformed rec-channels: {e}"),
            })?;

        let mut seen = Vec::with_capacity(rec_channels.len());
        for channel in &rec_channels {
            if seen.contains(&channel.id) {
                return Err(CoreError::ProtocolFailure {
                    message: format!("duplicate recording channel id {}", channel.id),
                });
            }
            seen.push(channel.id);
        }

        Ok(Some(Self { rec_channels }))
    }

    /// Folder of the primary recording channel.
    pub fn primary_folder(&self) -> Option<&str> {
        self.rec_channels
            .iter()
            .min_by_key(|c| c.id)
            .map(|c| c.dir_name.as_str())
    }
}

use serde::{Deserialize, Serialize};

use super::settings::SettingsDocument;

/// A live appliance found by discovery.
///
/// Replaced as a whole on every rescan; never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// The configured device name, or the address when it has none.
    pub id: String,
    pub address: String,
    /// Configured name; empty when settings could not be read.
    pub name: String,
    /// `None` when login or settings retrieval failed.
    pub settings: Option<SettingsDocument>,
}

impl DeviceDescriptor {
    pub fn from_settings(address: impl Into<String>, settings: SettingsDocument) -> Self {
        let address = address.into();
        let name = settings.name().unwrap_or_default().to_owned();
        let id = if name.is_empty() {
            address.clone()
        } else {
            name.clone()
        };
        let settings = (!settings.is_empty()).then_some(settings);
        Self {
            id,
            address,
            name,
            settings,
        }
    }
}

/// One row of a bulk push: where the device is and which id to stamp
/// into its recording paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    pub address: String,
    pub id: String,
}

impl DeviceTarget {
    pub fn new(address: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: id.into(),
        }
    }
}

// ── Settings merge ──

use crate::defaults::default_settings;
use crate::model::{SettingsDocument, is_identity_key};

/// Settings to push to device `target_id` given a control template.
///
/// Starts from the target's default document and replaces every top-level
/// key the template carries, except identity keys, which always keep the
/// target's own values. The merge is shallow: a replaced key takes the
/// template's value wholesale. Neither input is modified.
pub fn merge(target_id: &str, template: &SettingsDocument) -> SettingsDocument {
    let mut merged = default_settings(target_id);
    for (key, value) in template.as_map() {
        if is_identity_key(key) {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

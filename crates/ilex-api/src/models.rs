// Wire models for the i-Lex Connect API
//
// Only the fields the bridge interprets are typed; everything else the
// vendor returns is kept verbatim so nothing is lost between cycles.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `GET /api/devices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    pub results: Vec<DeviceDescriptor>,
}

/// One entry of the device listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Vendor serial number; the unique key of a device.
    pub serial: String,
    /// Product type, e.g. `"LEXplus10S"`.
    #[serde(default)]
    pub dtype: String,
    /// Remaining vendor metadata (connectivity, producer, naming, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `GET /api/devices/{serial}/live`: vendor field code → raw value.
///
/// Values are kept exactly as the server sent them (string, number,
/// bool, or null); interpretation happens in the entity layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveData(pub Map<String, Value>);

impl LiveData {
    pub fn get(&self, code: &str) -> Option<&Value> {
        self.0.get(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Firmware version reported by the device, if any.
    pub fn firmware_version(&self) -> Option<&str> {
        self.get("firmware_version").and_then(Value::as_str)
    }
}

impl FromIterator<(String, Value)> for LiveData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn descriptor_keeps_unknown_fields() {
        let raw = json!({
            "serial": "210812345",
            "dtype": "LEXplus10S",
            "connected": "online",
            "producent": "oceanic"
        });
        let desc: DeviceDescriptor = serde_json::from_value(raw).unwrap();

        assert_eq!(desc.serial, "210812345");
        assert_eq!(desc.dtype, "LEXplus10S");
        assert_eq!(desc.extra.get("producent"), Some(&json!("oceanic")));
        assert!(!desc.extra.contains_key("serial"));
    }

    #[test]
    fn descriptor_without_serial_is_rejected() {
        let raw = json!({ "dtype": "LEXplus10S" });
        assert!(serde_json::from_value::<DeviceDescriptor>(raw).is_err());
    }

    #[test]
    fn live_data_preserves_raw_values() {
        let raw = json!({
            "getPRS": "2.5",
            "getRES": 1180,
            "regeneration": false,
            "current_alarm": null,
            "firmware_version": "2.9"
        });
        let live: LiveData = serde_json::from_value(raw).unwrap();

        assert_eq!(live.len(), 5);
        assert_eq!(live.get("getPRS"), Some(&json!("2.5")));
        assert_eq!(live.get("getRES"), Some(&json!(1180)));
        assert_eq!(live.get("current_alarm"), Some(&Value::Null));
        assert_eq!(live.firmware_version(), Some("2.9"));
    }
}

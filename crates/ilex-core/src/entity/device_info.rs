// ── Device registry info ──

use serde::Serialize;

use crate::model::DeviceEntry;

/// Integration domain used in device identifiers.
pub const DOMAIN: &str = "syr_oceanic_ilex_connect";

pub const MANUFACTURER: &str = "Syr / Oceanic";

/// What a host registers for one physical unit. Every entity of the
/// device reports the same info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, serial)` pairs.
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    pub fn from_entry(entry: &DeviceEntry) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_string(), entry.meta.serial.clone())],
            name: format!("Syr Oceanic {}", entry.meta.dtype),
            manufacturer: MANUFACTURER.to_string(),
            model: entry.meta.dtype.clone(),
            sw_version: entry.live.firmware_version().map(str::to_string),
        }
    }
}

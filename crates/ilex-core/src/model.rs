// ── Published telemetry state ──

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ilex_api::{DeviceDescriptor, LiveData};

/// Listing metadata plus live telemetry of one device, fetched in the
/// same cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub meta: DeviceDescriptor,
    pub live: LiveData,
}

/// Serial → device entry. The single unit of published state.
///
/// Only contains devices that were listed *and* answered their live-data
/// request in the same cycle. Ordered by serial so two cycles over the
/// same server state compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    devices: BTreeMap<String, DeviceEntry>,
}

impl Snapshot {
    pub fn get(&self, serial: &str) -> Option<&DeviceEntry> {
        self.devices.get(serial)
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.devices.contains_key(serial)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn serials(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceEntry)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn insert(&mut self, meta: DeviceDescriptor, live: LiveData) {
        self.devices.insert(meta.serial.clone(), DeviceEntry { meta, live });
    }

    pub(crate) fn insert_entry(&mut self, serial: String, entry: DeviceEntry) {
        self.devices.insert(serial, entry);
    }
}

// ── Entity adapters ──
//
// Stateless projections of the published snapshot into host entities.
// An entity only remembers which device and which field it reads; every
// state query goes through an `EntityContext` captured from the
// coordinator.

pub mod binary_sensor;
pub mod device_info;
pub mod sensor;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::model::{DeviceEntry, Snapshot};

pub use binary_sensor::{BINARY_SENSORS, BinaryCheck, BinarySensorDescription, BinarySensorEntity};
pub use device_info::{DOMAIN, DeviceInfo, MANUFACTURER};
pub use sensor::{
    LastUpdateSensor, SENSORS, SensorDescription, SensorDeviceClass, SensorEntity,
    SensorStateClass, SensorValue, Unit,
};

// ── Context ──────────────────────────────────────────────────────

/// Point-in-time view of coordinator state used to evaluate entities.
///
/// Device lookups read the published snapshot first, then the last-known
/// view, so a device skipped by one cycle keeps its previous values.
#[derive(Debug, Clone)]
pub struct EntityContext {
    snapshot: Arc<Snapshot>,
    last_known: Arc<Snapshot>,
    last_update_success: bool,
    last_success: Option<DateTime<Utc>>,
}

impl EntityContext {
    pub fn new(
        snapshot: Arc<Snapshot>,
        last_update_success: bool,
        last_success: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            last_known: Arc::clone(&snapshot),
            snapshot,
            last_update_success,
            last_success,
        }
    }

    /// Use `last_known` as the fallback for devices missing from the
    /// snapshot.
    #[must_use]
    pub fn with_last_known(mut self, last_known: Arc<Snapshot>) -> Self {
        self.last_known = last_known;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Every device an entity can still report on: the snapshot plus
    /// devices skipped by the latest cycle.
    pub fn known_devices(&self) -> &Snapshot {
        &self.last_known
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    fn device(&self, serial: &str) -> Option<&DeviceEntry> {
        self.snapshot
            .get(serial)
            .or_else(|| self.last_known.get(serial))
    }
}

// ── State ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityState {
    /// Device no longer known, or the last cycle failed.
    Unavailable,
    /// Available, but the device reported nothing usable.
    Unknown,
    Value(SensorValue),
    Binary(bool),
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("unavailable"),
            Self::Unknown => f.write_str("unknown"),
            Self::Value(v) => write!(f, "{v}"),
            Self::Binary(true) => f.write_str("on"),
            Self::Binary(false) => f.write_str("off"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
}

// ── Entity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Sensor(SensorEntity),
    LastUpdate(LastUpdateSensor),
    BinarySensor(BinarySensorEntity),
}

impl Entity {
    pub fn serial(&self) -> &str {
        match self {
            Self::Sensor(e) => &e.serial,
            Self::LastUpdate(e) => &e.serial,
            Self::BinarySensor(e) => &e.serial,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Sensor(_) | Self::LastUpdate(_) => Platform::Sensor,
            Self::BinarySensor(_) => Platform::BinarySensor,
        }
    }

    pub fn unique_id(&self) -> String {
        match self {
            Self::Sensor(e) => e.unique_id(),
            Self::LastUpdate(e) => e.unique_id(),
            Self::BinarySensor(e) => e.unique_id(),
        }
    }

    pub fn translation_key(&self) -> &'static str {
        match self {
            Self::Sensor(e) => e.description.translation_key,
            Self::LastUpdate(_) => LastUpdateSensor::TRANSLATION_KEY,
            Self::BinarySensor(e) => e.description.translation_key,
        }
    }

    pub fn unit(&self) -> Option<Unit> {
        match self {
            Self::Sensor(e) => e.description.unit,
            _ => None,
        }
    }

    pub fn device_class(&self) -> Option<SensorDeviceClass> {
        match self {
            Self::Sensor(e) => e.description.device_class,
            Self::LastUpdate(_) => Some(LastUpdateSensor::DEVICE_CLASS),
            Self::BinarySensor(_) => None,
        }
    }

    pub fn available(&self, ctx: &EntityContext) -> bool {
        ctx.last_update_success() && ctx.device(self.serial()).is_some()
    }

    pub fn state(&self, ctx: &EntityContext) -> EntityState {
        if !self.available(ctx) {
            return EntityState::Unavailable;
        }
        let Some(entry) = ctx.device(self.serial()) else {
            return EntityState::Unavailable;
        };

        let state = match self {
            Self::Sensor(e) => e.native_value(&entry.live).map(EntityState::Value),
            Self::LastUpdate(_) => ctx
                .last_success()
                .map(|t| EntityState::Value(SensorValue::Timestamp(t))),
            Self::BinarySensor(e) => e.is_on(&entry.live).map(EntityState::Binary),
        };
        state.unwrap_or(EntityState::Unknown)
    }

    /// Registry info for the owning device, if it is still known.
    pub fn device_info(&self, ctx: &EntityContext) -> Option<DeviceInfo> {
        ctx.device(self.serial()).map(DeviceInfo::from_entry)
    }
}

/// Every entity for every device in `snapshot`: all table sensors, the
/// last-update sensor, then all binary sensors.
pub fn entities_for(snapshot: &Snapshot) -> Vec<Entity> {
    let per_device = SENSORS.len() + 1 + BINARY_SENSORS.len();
    let mut entities = Vec::with_capacity(snapshot.len() * per_device);

    for serial in snapshot.serials() {
        entities.extend(
            SENSORS
                .iter()
                .map(|d| Entity::Sensor(SensorEntity::new(serial, d))),
        );
        entities.push(Entity::LastUpdate(LastUpdateSensor::new(serial)));
        entities.extend(
            BINARY_SENSORS
                .iter()
                .map(|d| Entity::BinarySensor(BinarySensorEntity::new(serial, d))),
        );
    }

    entities
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ilex_api::{DeviceDescriptor, LiveData};
    use serde_json::{Map, json};

    use super::*;

    fn snapshot(serials: &[&str]) -> Snapshot {
        let mut snap = Snapshot::default();
        for serial in serials {
            let live: LiveData = [
                ("getPRS".to_string(), json!("2.5")),
                ("status".to_string(), json!("online")),
            ]
            .into_iter()
            .collect();
            snap.insert(
                DeviceDescriptor {
                    serial: (*serial).to_string(),
                    dtype: "LEXplus10S".into(),
                    extra: Map::new(),
                },
                live,
            );
        }
        snap
    }

    fn find<'a>(entities: &'a [Entity], unique_id: &str) -> &'a Entity {
        entities.iter().find(|e| e.unique_id() == unique_id).unwrap()
    }

    #[test]
    fn enumerates_all_entities_per_device() {
        let entities = entities_for(&snapshot(&["A", "B"]));
        assert_eq!(
            entities.len(),
            2 * (SENSORS.len() + 1 + BINARY_SENSORS.len())
        );

        let ids: Vec<_> = entities.iter().map(Entity::unique_id).collect();
        assert!(ids.contains(&"A_getPRS".to_string()));
        assert!(ids.contains(&"B_last_update".to_string()));
        assert!(ids.contains(&"B_getNET".to_string()));
    }

    #[test]
    fn states_read_from_snapshot() {
        let snap = Arc::new(snapshot(&["A"]));
        let now = Utc::now();
        let ctx = EntityContext::new(Arc::clone(&snap), true, Some(now));
        let entities = entities_for(&snap);

        assert_eq!(
            find(&entities, "A_getPRS").state(&ctx),
            EntityState::Value(SensorValue::Number(2.5))
        );
        assert_eq!(find(&entities, "A_status").state(&ctx), EntityState::Binary(true));
        assert_eq!(find(&entities, "A_getFLO").state(&ctx), EntityState::Unknown);
        assert_eq!(
            find(&entities, "A_last_update").state(&ctx),
            EntityState::Value(SensorValue::Timestamp(now))
        );
    }

    #[test]
    fn unavailable_after_failed_update() {
        let snap = Arc::new(snapshot(&["A"]));
        let ctx = EntityContext::new(Arc::clone(&snap), false, None);
        let entities = entities_for(&snap);

        assert!(entities.iter().all(|e| !e.available(&ctx)));
        assert_eq!(find(&entities, "A_getPRS").state(&ctx), EntityState::Unavailable);
    }

    #[test]
    fn skipped_device_reports_last_known_values() {
        let known = Arc::new(snapshot(&["A", "B"]));
        let ctx = EntityContext::new(Arc::new(snapshot(&["A"])), true, Some(Utc::now()))
            .with_last_known(Arc::clone(&known));
        let entities = entities_for(ctx.known_devices());
        assert_eq!(entities.len(), entities_for(&known).len());

        let b = find(&entities, "B_getPRS");
        assert!(b.available(&ctx));
        assert_eq!(b.state(&ctx), EntityState::Value(SensorValue::Number(2.5)));
        assert_eq!(find(&entities, "B_status").state(&ctx), EntityState::Binary(true));
        assert!(b.device_info(&ctx).is_some());
    }

    #[test]
    fn unavailable_when_device_is_no_longer_known() {
        let entities = entities_for(&snapshot(&["A", "B"]));
        let ctx = EntityContext::new(Arc::new(snapshot(&["A"])), true, Some(Utc::now()));

        let b = find(&entities, "B_getPRS");
        assert!(!b.available(&ctx));
        assert_eq!(b.state(&ctx), EntityState::Unavailable);
        assert!(b.device_info(&ctx).is_none());
        assert!(find(&entities, "A_getPRS").available(&ctx));
    }

    #[test]
    fn device_classes() {
        let entities = entities_for(&snapshot(&["A"]));
        assert_eq!(
            find(&entities, "A_last_update").device_class(),
            Some(SensorDeviceClass::Timestamp)
        );
        assert_eq!(
            find(&entities, "A_getPRS").device_class(),
            Some(SensorDeviceClass::Pressure)
        );
        assert_eq!(find(&entities, "A_status").device_class(), None);
    }

    #[test]
    fn state_display() {
        assert_eq!(EntityState::Binary(true).to_string(), "on");
        assert_eq!(EntityState::Unavailable.to_string(), "unavailable");
        assert_eq!(EntityState::Value(SensorValue::Number(2.5)).to_string(), "2.5");
    }
}

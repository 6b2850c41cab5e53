// ── Sensors ──
//
// One sensor per vendor field code, described by a static table, plus a
// per-device "last update" timestamp sensor.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display, IntoStaticStr};
use tracing::warn;

use ilex_api::LiveData;

/// Unit of measurement reported with a sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, IntoStaticStr)]
#[serde(into = "&'static str")]
pub enum Unit {
    #[strum(serialize = "bar")]
    Bar,
    #[strum(serialize = "L")]
    Liters,
    #[strum(serialize = "m³")]
    CubicMeters,
    #[strum(serialize = "d")]
    Days,
    /// French degree of water hardness.
    #[strum(serialize = "°fH")]
    FrenchDegree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorDeviceClass {
    Pressure,
    Water,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SensorStateClass {
    Measurement,
    Total,
    TotalIncreasing,
}

// ── Description table ────────────────────────────────────────────

/// Static presentation data for one vendor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorDescription {
    /// Vendor field code in the live payload, e.g. `getPRS`.
    pub key: &'static str,
    pub translation_key: &'static str,
    pub unit: Option<Unit>,
    pub device_class: Option<SensorDeviceClass>,
    pub state_class: Option<SensorStateClass>,
}

impl SensorDescription {
    const fn new(key: &'static str, translation_key: &'static str) -> Self {
        Self {
            key,
            translation_key,
            unit: None,
            device_class: None,
            state_class: None,
        }
    }

    const fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    const fn device_class(mut self, class: SensorDeviceClass) -> Self {
        self.device_class = Some(class);
        self
    }

    const fn state_class(mut self, class: SensorStateClass) -> Self {
        self.state_class = Some(class);
        self
    }

    const fn water_total(key: &'static str, translation_key: &'static str) -> Self {
        Self::new(key, translation_key)
            .unit(Unit::CubicMeters)
            .device_class(SensorDeviceClass::Water)
            .state_class(SensorStateClass::Total)
    }

    /// Whether values are parsed as numbers.
    pub fn is_numeric(&self) -> bool {
        self.unit.is_some()
    }
}

pub const SENSORS: &[SensorDescription] = &[
    SensorDescription::new("getPRS", "water_pressure")
        .unit(Unit::Bar)
        .device_class(SensorDeviceClass::Pressure)
        .state_class(SensorStateClass::Measurement),
    SensorDescription::new("getFLO", "current_flow")
        .unit(Unit::Liters)
        .state_class(SensorStateClass::Measurement),
    SensorDescription::new("getRES", "remaining_capacity")
        .unit(Unit::Liters)
        .state_class(SensorStateClass::Measurement),
    SensorDescription::water_total("getTOF", "water_used_today"),
    SensorDescription::water_total("getYEF", "water_used_yesterday"),
    SensorDescription::water_total("getCWF", "water_used_current_week"),
    SensorDescription::water_total("getLWF", "water_used_last_week"),
    SensorDescription::water_total("getCMF", "water_used_current_month"),
    SensorDescription::water_total("getLMF", "water_used_last_month"),
    SensorDescription::new("getRPD", "days_remaining").unit(Unit::Days),
    SensorDescription::new("getCOF", "total_usage")
        .unit(Unit::CubicMeters)
        .device_class(SensorDeviceClass::Water)
        .state_class(SensorStateClass::TotalIncreasing),
    SensorDescription::new("getUWF", "total_usage_hard_water")
        .unit(Unit::CubicMeters)
        .device_class(SensorDeviceClass::Water)
        .state_class(SensorStateClass::TotalIncreasing),
    SensorDescription::new("getLAR", "last_regeneration"),
    SensorDescription::new("getNOR", "normal_regenerations"),
    SensorDescription::new("getSRE", "service_regenerations"),
    SensorDescription::new("getINR", "incomplete_regenerations"),
    SensorDescription::new("getIWH", "inbound_water_hardness").unit(Unit::FrenchDegree),
    SensorDescription::new("getOWH", "outbound_water_hardness").unit(Unit::FrenchDegree),
];

// ── Values ───────────────────────────────────────────────────────

/// A sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// Interpret a raw live-data field according to its description.
///
/// Missing, null, and empty-string values have no reading. Numeric
/// sensors accept JSON numbers and numeric strings; anything else is
/// logged and dropped.
pub fn parse_value(description: &SensorDescription, raw: Option<&Value>) -> Option<SensorValue> {
    let raw = match raw? {
        Value::Null => return None,
        Value::String(s) if s.is_empty() => return None,
        other => other,
    };

    if !description.is_numeric() {
        let text = match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Some(SensorValue::Text(text));
    }

    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    if number.is_none() {
        warn!(
            sensor = description.translation_key,
            value = %raw,
            "could not convert value to a number"
        );
    }
    number.map(SensorValue::Number)
}

// ── Entities ─────────────────────────────────────────────────────

/// A table-driven sensor bound to one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorEntity {
    pub serial: String,
    pub description: &'static SensorDescription,
}

impl SensorEntity {
    pub fn new(serial: impl Into<String>, description: &'static SensorDescription) -> Self {
        Self {
            serial: serial.into(),
            description,
        }
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.serial, self.description.key)
    }

    pub fn native_value(&self, live: &LiveData) -> Option<SensorValue> {
        parse_value(self.description, live.get(self.description.key))
    }
}

/// When the coordinator last completed a successful cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastUpdateSensor {
    pub serial: String,
}

impl LastUpdateSensor {
    pub const TRANSLATION_KEY: &'static str = "last_update";
    pub const DEVICE_CLASS: SensorDeviceClass = SensorDeviceClass::Timestamp;

    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
        }
    }

    pub fn unique_id(&self) -> String {
        format!("{}_last_update", self.serial)
    }
}

// ── Binary sensors ──

use serde::Serialize;
use serde_json::Value;
use strum::{AsRefStr, Display};

use ilex_api::LiveData;

/// How a raw field is turned into on/off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BinaryCheck {
    /// On when the value is the string `"online"`.
    Online,
    /// On when the value is truthy: `true`, a non-zero number, or a
    /// non-empty string, array, or object.
    Truthy,
    /// On for anything but null or the empty string.
    NotEmpty,
}

impl BinaryCheck {
    pub fn evaluate(self, value: &Value) -> bool {
        match self {
            Self::Online => value.as_str() == Some("online"),
            Self::Truthy => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                Value::Object(o) => !o.is_empty(),
            },
            Self::NotEmpty => match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BinarySensorDescription {
    pub key: &'static str,
    pub translation_key: &'static str,
    pub check: BinaryCheck,
}

pub const BINARY_SENSORS: &[BinarySensorDescription] = &[
    BinarySensorDescription {
        key: "status",
        translation_key: "connected",
        check: BinaryCheck::Online,
    },
    BinarySensorDescription {
        key: "regeneration",
        translation_key: "regeneration_active",
        check: BinaryCheck::Truthy,
    },
    BinarySensorDescription {
        key: "current_alarm",
        translation_key: "alarm_active",
        check: BinaryCheck::NotEmpty,
    },
    BinarySensorDescription {
        key: "getNET",
        translation_key: "network_connected",
        check: BinaryCheck::NotEmpty,
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinarySensorEntity {
    pub serial: String,
    pub description: &'static BinarySensorDescription,
}

impl BinarySensorEntity {
    pub fn new(serial: impl Into<String>, description: &'static BinarySensorDescription) -> Self {
        Self {
            serial: serial.into(),
            description,
        }
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.serial, self.description.key)
    }

    /// `None` when the device did not report the field at all.
    pub fn is_on(&self, live: &LiveData) -> Option<bool> {
        live.get(self.description.key)
            .map(|value| self.description.check.evaluate(value))
    }
}

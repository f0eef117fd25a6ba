use std::fmt;

use serde::Serialize;

/// Opaque platform identifier of an input (port UID on iOS, device id on Android).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A hardware or software audio input currently exposed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDevice {
    pub id: DeviceId,
    pub label: String,
    pub max_channels: u16,
}

impl InputDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>, max_channels: u16) -> Self {
        Self {
            id: DeviceId::new(id),
            label: label.into(),
            max_channels,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::device::InputDevice;

/// Process-unique identifier of an applied route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RouteId(pub u64);

/// Category requested from the platform audio subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioCategory {
    /// Capture only. Used for background recording.
    Record,
    /// Capture with simultaneous playback.
    PlayAndRecord,
}

/// Audio manager mode applied together with the category.
///
/// Platforms without an equivalent of a mode map it to their default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioMode {
    #[default]
    Normal,
    Ringtone,
    /// Reserved for the telephony stack on most platforms.
    InCall,
    /// VoIP-style capture with echo handling tuned for conversation.
    InCommunication,
}

/// The audio configuration currently applied to the platform.
///
/// Owned by the `RouteManager`; callers receive copies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRoute {
    pub id: RouteId,
    /// `None` means the platform default input.
    pub device: Option<InputDevice>,
    pub category: AudioCategory,
    pub mode: AudioMode,
    pub sample_rate: u32,
    pub channels: u16,
    pub active: bool,
    /// `false` when the host manages the audio session itself.
    pub managed: bool,
    pub speakerphone: bool,
    /// A Bluetooth SCO link was brought up for this route.
    pub bluetooth_sco: bool,
    pub activated_at: DateTime<Utc>,
}

impl ActiveRoute {
    pub fn is_default_input(&self) -> bool {
        self.device.is_none()
    }
}

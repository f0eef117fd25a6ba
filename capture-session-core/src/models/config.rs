use serde::Deserialize;

use super::device::DeviceId;
use super::error::SessionError;
use super::route::AudioMode;

/// Highest sample rate the mobile audio subsystems accept as a preference.
pub const PLATFORM_SAMPLE_RATE_CEILING: u32 = 48_000;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;

pub const DEFAULT_NOTIFICATION_TITLE: &str = "Recording audio";
pub const DEFAULT_NOTIFICATION_BODY: &str = "Audio recording is active";
pub const DEFAULT_NOTIFICATION_ICON: &str = "ic_notification_overlay";

/// Opaque handle to the media pipeline's output (a path, a stream id, ...).
/// The session core only carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputTarget(String);

impl OutputTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Notification shown while background recording keeps the process alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDescriptor {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
}

/// A descriptor with every field filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl NotificationDescriptor {
    pub fn resolve(&self) -> ResolvedNotification {
        ResolvedNotification {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
            body: self
                .body
                .clone()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.to_string()),
            icon: self
                .icon
                .clone()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_ICON.to_string()),
        }
    }
}

/// Options forwarded untouched to category selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryOptions {
    pub mix_with_others: bool,
    pub allow_bluetooth: bool,
    pub default_to_speaker: bool,
}

/// What to do when the requested input device is not currently enumerable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DevicePolicy {
    /// Route through the platform default input.
    #[default]
    Fallback,
    /// Fail with `InputRoutingFailed`.
    Strict,
}

/// Raw recording request as delivered by the host bridge.
///
/// Every field is optional; [`CaptureConfiguration::from_request`] applies
/// defaults and clamps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureRequest {
    pub output: Option<String>,
    pub sample_rate: Option<u32>,
    pub num_channels: Option<i64>,
    pub device_id: Option<String>,
    pub auto_gain: bool,
    pub echo_cancel: bool,
    pub noise_suppress: bool,
    pub enable_background_recording: bool,
    pub notification: NotificationDescriptor,
    pub manage_audio_session: Option<bool>,
    pub category_options: CategoryOptions,
    pub prefers_no_system_alert_interruptions: Option<bool>,
    pub device_policy: DevicePolicy,
    pub audio_manager_mode: AudioMode,
    pub speakerphone: bool,
    pub manage_bluetooth: Option<bool>,
}

impl CaptureRequest {
    /// Parse a bridge payload.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidConfiguration(format!("malformed request: {}", e)))
    }
}

/// Immutable recording parameters for one session.
///
/// Fields are private so the channel and sample-rate invariants cannot be
/// broken after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    output: OutputTarget,
    sample_rate: u32,
    channels: u16,
    device_id: Option<DeviceId>,
    auto_gain: bool,
    echo_cancel: bool,
    noise_suppress: bool,
    background_recording: bool,
    notification: NotificationDescriptor,
    manage_audio_session: bool,
    category_options: CategoryOptions,
    prefers_no_system_alert_interruptions: bool,
    device_policy: DevicePolicy,
    audio_mode: AudioMode,
    speakerphone: bool,
    manage_bluetooth: bool,
}

impl CaptureConfiguration {
    /// Build a configuration from a raw request, clamping what can be
    /// clamped and rejecting the rest.
    pub fn from_request(request: CaptureRequest) -> Result<Self, SessionError> {
        let output = match request.output {
            Some(target) if !target.trim().is_empty() => OutputTarget::new(target),
            _ => {
                return Err(SessionError::InvalidConfiguration(
                    "output target is required".into(),
                ))
            }
        };

        let sample_rate = request.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(SessionError::InvalidConfiguration(
                "sample rate must be positive".into(),
            ));
        }

        let channels = request
            .num_channels
            .map(|n| n.clamp(1, 2) as u16)
            .unwrap_or(DEFAULT_CHANNELS);

        Ok(Self {
            output,
            sample_rate: sample_rate.min(PLATFORM_SAMPLE_RATE_CEILING),
            channels,
            device_id: request.device_id.map(DeviceId::new),
            auto_gain: request.auto_gain,
            echo_cancel: request.echo_cancel,
            noise_suppress: request.noise_suppress,
            background_recording: request.enable_background_recording,
            notification: request.notification,
            manage_audio_session: request.manage_audio_session.unwrap_or(true),
            category_options: request.category_options,
            prefers_no_system_alert_interruptions: request
                .prefers_no_system_alert_interruptions
                .unwrap_or(true),
            device_policy: request.device_policy,
            audio_mode: request.audio_manager_mode,
            speakerphone: request.speakerphone,
            manage_bluetooth: request.manage_bluetooth.unwrap_or(true),
        })
    }

    pub fn output(&self) -> &OutputTarget {
        &self.output
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_id(&self) -> Option<&DeviceId> {
        self.device_id.as_ref()
    }

    pub fn auto_gain(&self) -> bool {
        self.auto_gain
    }

    pub fn echo_cancel(&self) -> bool {
        self.echo_cancel
    }

    pub fn noise_suppress(&self) -> bool {
        self.noise_suppress
    }

    pub fn background_recording(&self) -> bool {
        self.background_recording
    }

    pub fn notification(&self) -> &NotificationDescriptor {
        &self.notification
    }

    pub fn manage_audio_session(&self) -> bool {
        self.manage_audio_session
    }

    pub fn category_options(&self) -> CategoryOptions {
        self.category_options
    }

    pub fn prefers_no_system_alert_interruptions(&self) -> bool {
        self.prefers_no_system_alert_interruptions
    }

    pub fn device_policy(&self) -> DevicePolicy {
        self.device_policy
    }

    pub fn audio_mode(&self) -> AudioMode {
        self.audio_mode
    }

    pub fn speakerphone(&self) -> bool {
        self.speakerphone
    }

    /// Bring up a Bluetooth SCO link for capture when a headset is connected.
    pub fn manage_bluetooth(&self) -> bool {
        self.manage_bluetooth
    }
}

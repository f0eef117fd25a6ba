use crate::models::config::CategoryOptions;
use crate::models::device::InputDevice;
use crate::models::error::PlatformError;
use crate::models::route::{AudioCategory, AudioMode};

/// The platform audio subsystem (AVAudioSession on iOS, AudioManager on Android).
///
/// Implementations are shared between the caller thread and the
/// interruption dispatcher, so every method takes `&self`.
pub trait AudioPlatform: Send + Sync {
    /// Select category, mode and options.
    fn set_category(
        &self,
        category: AudioCategory,
        mode: AudioMode,
        options: CategoryOptions,
    ) -> Result<(), PlatformError>;

    fn set_preferred_sample_rate(&self, sample_rate: u32) -> Result<(), PlatformError>;

    /// Highest sample rate the platform accepts as a preference.
    fn max_sample_rate(&self) -> u32;

    /// Whether the OS lets the app opt out of system-alert interruptions.
    fn supports_no_interruption_preference(&self) -> bool {
        false
    }

    fn set_prefers_no_interruptions_from_system_alerts(
        &self,
        _prefers: bool,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Activate or deactivate the session. Activation notifies other audio
    /// consumers so they can resume once this session deactivates.
    fn set_active(&self, active: bool) -> Result<(), PlatformError>;

    /// Maximum input channels of the currently active route. Zero means no
    /// input capability.
    fn max_input_channels(&self) -> u16;

    /// Current sample rate reported by the hardware.
    fn current_sample_rate(&self) -> u32;

    fn set_preferred_input_channels(&self, channels: u16) -> Result<(), PlatformError>;

    /// Enumerate currently available inputs. No ordering is guaranteed.
    fn available_inputs(&self) -> Result<Vec<InputDevice>, PlatformError>;

    fn set_preferred_input(&self, device: &InputDevice) -> Result<(), PlatformError>;

    /// Route playback to the loudspeaker. Ignored where there is no such switch.
    fn set_speakerphone(&self, _on: bool) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Bring up the Bluetooth SCO link for headset capture. Returns whether
    /// a link is up; `false` when no headset is connected.
    fn start_bluetooth_sco(&self) -> Result<bool, PlatformError> {
        Ok(false)
    }

    fn stop_bluetooth_sco(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

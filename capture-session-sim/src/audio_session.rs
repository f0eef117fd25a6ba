//! Simulated platform audio session.
//!
//! Behaves like a mobile audio session: preferences are accepted only within
//! hardware limits, channel and input preferences require an active session,
//! and inputs can be plugged in or pulled out at any time.

use std::collections::HashSet;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use capture_session_core::models::config::CategoryOptions;
use capture_session_core::models::device::InputDevice;
use capture_session_core::models::error::PlatformError;
use capture_session_core::models::route::{AudioCategory, AudioMode};
use capture_session_core::traits::audio_platform::AudioPlatform;

/// Operations that can be journaled and made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    SetCategory,
    SetSampleRate,
    SetNoInterruptionPreference,
    Activate,
    Deactivate,
    SetInputChannels,
    EnumerateInputs,
    SetPreferredInput,
    SetSpeakerphone,
    StartBluetoothSco,
    StopBluetoothSco,
}

impl fmt::Display for SimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetCategory => "setCategory",
            Self::SetSampleRate => "setPreferredSampleRate",
            Self::SetNoInterruptionPreference => "setPrefersNoInterruptionsFromSystemAlerts",
            Self::Activate => "setActive(true)",
            Self::Deactivate => "setActive(false)",
            Self::SetInputChannels => "setPreferredInputNumberOfChannels",
            Self::EnumerateInputs => "availableInputs",
            Self::SetPreferredInput => "setPreferredInput",
            Self::SetSpeakerphone => "setSpeakerphoneOn",
            Self::StartBluetoothSco => "startBluetoothSco",
            Self::StopBluetoothSco => "stopBluetoothSco",
        };
        f.write_str(name)
    }
}

/// Snapshot of what the simulated hardware currently has applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareState {
    pub active: bool,
    pub category: Option<AudioCategory>,
    pub mode: AudioMode,
    pub options: CategoryOptions,
    pub sample_rate: u32,
    pub input_channels: u16,
    pub preferred_input: Option<String>,
    pub no_interruption_preference: bool,
    pub speakerphone: bool,
    pub bluetooth_sco: bool,
}

struct Inner {
    hardware: HardwareState,
    inputs: Vec<InputDevice>,
    failing: HashSet<SimOp>,
    journal: Vec<SimOp>,
    builtin_channels: u16,
    bluetooth_headset: bool,
    hold_activation: bool,
    waiting_activation: bool,
}

/// In-memory stand-in for AVAudioSession / AudioManager.
pub struct SimAudioSession {
    inner: Mutex<Inner>,
    activation_gate: Condvar,
    max_sample_rate: u32,
    supports_no_interruption: bool,
}

impl SimAudioSession {
    pub const DEFAULT_HARDWARE_RATE: u32 = 44_100;

    /// A session on a recent OS with one built-in stereo microphone.
    pub fn new() -> Self {
        Self::with_limits(48_000, true)
    }

    pub fn with_limits(max_sample_rate: u32, supports_no_interruption: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                hardware: HardwareState {
                    active: false,
                    category: None,
                    mode: AudioMode::Normal,
                    options: CategoryOptions::default(),
                    sample_rate: Self::DEFAULT_HARDWARE_RATE,
                    input_channels: 1,
                    preferred_input: None,
                    no_interruption_preference: false,
                    speakerphone: false,
                    bluetooth_sco: false,
                },
                inputs: vec![InputDevice::new("builtin-mic", "Built-In Microphone", 2)],
                failing: HashSet::new(),
                journal: Vec::new(),
                builtin_channels: 2,
                bluetooth_headset: false,
                hold_activation: false,
                waiting_activation: false,
            }),
            activation_gate: Condvar::new(),
            max_sample_rate,
            supports_no_interruption,
        }
    }

    pub fn plug_in(&self, device: InputDevice) {
        log::debug!("sim: input {} connected", device.id);
        let mut inner = self.inner.lock();
        inner.inputs.retain(|d| d.id != device.id);
        inner.inputs.push(device);
    }

    /// Remove an input. If it was the preferred input the route falls back
    /// to the built-in microphone.
    pub fn unplug(&self, id: &str) {
        log::debug!("sim: input {} disconnected", id);
        let mut inner = self.inner.lock();
        inner.inputs.retain(|d| d.id.as_str() != id);
        if inner.hardware.preferred_input.as_deref() == Some(id) {
            inner.hardware.preferred_input = None;
        }
    }

    /// Connect or disconnect a Bluetooth headset capable of SCO capture.
    /// Disconnecting drops a running SCO link.
    pub fn set_bluetooth_headset(&self, connected: bool) {
        log::debug!("sim: bluetooth headset connected={}", connected);
        let mut inner = self.inner.lock();
        inner.bluetooth_headset = connected;
        if !connected {
            inner.hardware.bluetooth_sco = false;
        }
    }

    /// Channel capability reported when no specific input is preferred.
    /// Zero simulates a route without input capability.
    pub fn set_builtin_channels(&self, channels: u16) {
        self.inner.lock().builtin_channels = channels;
    }

    /// Make `op` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail(&self, op: SimOp) {
        self.inner.lock().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().failing.clear();
    }

    /// Block the next activation until [`release_activation`](Self::release_activation).
    pub fn hold_activation(&self) {
        self.inner.lock().hold_activation = true;
    }

    pub fn release_activation(&self) {
        self.inner.lock().hold_activation = false;
        self.activation_gate.notify_all();
    }

    /// Whether an activation is currently parked on the gate.
    pub fn activation_waiting(&self) -> bool {
        self.inner.lock().waiting_activation
    }

    pub fn hardware(&self) -> HardwareState {
        self.inner.lock().hardware.clone()
    }

    pub fn journal(&self) -> Vec<SimOp> {
        self.inner.lock().journal.clone()
    }

    pub fn count(&self, op: SimOp) -> usize {
        self.inner.lock().journal.iter().filter(|o| **o == op).count()
    }

    fn begin(&self, op: SimOp) -> Result<parking_lot::MutexGuard<'_, Inner>, PlatformError> {
        let mut inner = self.inner.lock();
        inner.journal.push(op);
        if inner.failing.contains(&op) {
            log::debug!("sim: {} refused", op);
            return Err(PlatformError::new(format!("{} refused by simulated platform", op)));
        }
        Ok(inner)
    }

    fn route_channels(inner: &Inner) -> u16 {
        match &inner.hardware.preferred_input {
            Some(id) => inner
                .inputs
                .iter()
                .find(|d| d.id.as_str() == id)
                .map(|d| d.max_channels)
                .unwrap_or(inner.builtin_channels),
            None => inner.builtin_channels,
        }
    }
}

impl Default for SimAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for SimAudioSession {
    fn set_category(
        &self,
        category: AudioCategory,
        mode: AudioMode,
        options: CategoryOptions,
    ) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetCategory)?;
        if category == AudioCategory::Record && options.default_to_speaker {
            return Err(PlatformError::new("defaultToSpeaker requires playAndRecord"));
        }
        if mode == AudioMode::InCall {
            return Err(PlatformError::new("in-call mode is reserved for the telephony stack"));
        }
        inner.hardware.category = Some(category);
        inner.hardware.mode = mode;
        inner.hardware.options = options;
        Ok(())
    }

    fn set_preferred_sample_rate(&self, sample_rate: u32) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetSampleRate)?;
        if sample_rate == 0 || sample_rate > self.max_sample_rate {
            return Err(PlatformError::new(format!("unsupported rate {}", sample_rate)));
        }
        inner.hardware.sample_rate = sample_rate;
        Ok(())
    }

    fn max_sample_rate(&self) -> u32 {
        self.max_sample_rate
    }

    fn supports_no_interruption_preference(&self) -> bool {
        self.supports_no_interruption
    }

    fn set_prefers_no_interruptions_from_system_alerts(
        &self,
        prefers: bool,
    ) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetNoInterruptionPreference)?;
        inner.hardware.no_interruption_preference = prefers;
        Ok(())
    }

    fn set_active(&self, active: bool) -> Result<(), PlatformError> {
        let op = if active { SimOp::Activate } else { SimOp::Deactivate };
        let mut inner = self.begin(op)?;
        if active {
            inner.waiting_activation = inner.hold_activation;
            while inner.hold_activation {
                self.activation_gate.wait(&mut inner);
            }
            inner.waiting_activation = false;
        } else {
            inner.hardware.input_channels = 1;
        }
        inner.hardware.active = active;
        Ok(())
    }

    fn max_input_channels(&self) -> u16 {
        let inner = self.inner.lock();
        if !inner.hardware.active {
            return 0;
        }
        Self::route_channels(&inner)
    }

    fn current_sample_rate(&self) -> u32 {
        self.inner.lock().hardware.sample_rate
    }

    fn set_preferred_input_channels(&self, channels: u16) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetInputChannels)?;
        if !inner.hardware.active {
            return Err(PlatformError::new("session is not active"));
        }
        if channels > Self::route_channels(&inner) {
            return Err(PlatformError::new(format!("route cannot provide {} channels", channels)));
        }
        inner.hardware.input_channels = channels;
        Ok(())
    }

    fn available_inputs(&self) -> Result<Vec<InputDevice>, PlatformError> {
        let inner = self.begin(SimOp::EnumerateInputs)?;
        // Platforms make no ordering promise.
        Ok(inner.inputs.iter().rev().cloned().collect())
    }

    fn set_preferred_input(&self, device: &InputDevice) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetPreferredInput)?;
        if !inner.hardware.active {
            return Err(PlatformError::new("session is not active"));
        }
        if !inner.inputs.iter().any(|d| d.id == device.id) {
            return Err(PlatformError::new(format!("input {} is gone", device.id)));
        }
        inner.hardware.preferred_input = Some(device.id.to_string());
        Ok(())
    }

    fn set_speakerphone(&self, on: bool) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::SetSpeakerphone)?;
        inner.hardware.speakerphone = on;
        Ok(())
    }

    fn start_bluetooth_sco(&self) -> Result<bool, PlatformError> {
        let mut inner = self.begin(SimOp::StartBluetoothSco)?;
        if !inner.bluetooth_headset {
            return Ok(false);
        }
        if !inner.hardware.active {
            return Err(PlatformError::new("session is not active"));
        }
        inner.hardware.bluetooth_sco = true;
        Ok(true)
    }

    fn stop_bluetooth_sco(&self) -> Result<(), PlatformError> {
        let mut inner = self.begin(SimOp::StopBluetoothSco)?;
        inner.hardware.bluetooth_sco = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_preference_requires_activation() {
        let session = SimAudioSession::new();

        assert!(session.set_preferred_input_channels(1).is_err());
        session.set_active(true).unwrap();
        session.set_preferred_input_channels(2).unwrap();

        assert_eq!(session.hardware().input_channels, 2);
    }

    #[test]
    fn inactive_route_reports_no_channels() {
        let session = SimAudioSession::new();
        assert_eq!(session.max_input_channels(), 0);
    }

    #[test]
    fn unplugging_preferred_input_falls_back() {
        let session = SimAudioSession::new();
        session.plug_in(InputDevice::new("usb", "USB Interface", 2));
        session.set_active(true).unwrap();
        session
            .set_preferred_input(&InputDevice::new("usb", "USB Interface", 2))
            .unwrap();

        session.unplug("usb");

        assert_eq!(session.hardware().preferred_input, None);
        assert_eq!(session.available_inputs().unwrap().len(), 1);
    }

    #[test]
    fn failures_are_journaled() {
        let session = SimAudioSession::new();
        session.fail(SimOp::SetCategory);

        let result = session.set_category(
            AudioCategory::PlayAndRecord,
            AudioMode::Normal,
            CategoryOptions::default(),
        );

        assert!(result.is_err());
        assert_eq!(session.journal(), vec![SimOp::SetCategory]);
    }

    #[test]
    fn sco_needs_a_headset() {
        let session = SimAudioSession::new();
        session.set_active(true).unwrap();
        assert!(!session.start_bluetooth_sco().unwrap());

        session.set_bluetooth_headset(true);
        assert!(session.start_bluetooth_sco().unwrap());
        assert!(session.hardware().bluetooth_sco);

        session.set_bluetooth_headset(false);
        assert!(!session.hardware().bluetooth_sco);
    }

    #[test]
    fn in_call_mode_is_refused() {
        let session = SimAudioSession::new();
        let result = session.set_category(
            AudioCategory::PlayAndRecord,
            AudioMode::InCall,
            CategoryOptions::default(),
        );
        assert!(result.is_err());
        assert_eq!(session.hardware().category, None);
    }

    #[test]
    fn rejects_rates_above_hardware() {
        let session = SimAudioSession::with_limits(16_000, false);
        assert!(session.set_preferred_sample_rate(44_100).is_err());
        assert!(session.set_preferred_sample_rate(16_000).is_ok());
    }
}

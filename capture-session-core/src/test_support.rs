//! In-crate fakes for the platform traits.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;

use parking_lot::Mutex;

use crate::models::config::{CategoryOptions, ResolvedNotification};
use crate::models::device::InputDevice;
use crate::models::error::PlatformError;
use crate::models::route::{AudioCategory, AudioMode};
use crate::traits::audio_platform::AudioPlatform;
use crate::traits::continuity_keeper::{ContinuityKeeper, KeeperHandle};
use crate::traits::interruption_source::{InterruptionEvent, InterruptionSource, SubscriptionToken};

#[derive(Default)]
struct PlatformState {
    calls: Vec<String>,
    failing: HashSet<&'static str>,
    inputs: Vec<InputDevice>,
    max_input_channels: u16,
    active: bool,
    preferred_input: Option<String>,
    bluetooth_headset: bool,
}

pub struct FakePlatform {
    state: Mutex<PlatformState>,
    ceiling: u32,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState {
                max_input_channels: 2,
                ..Default::default()
            }),
            ceiling: 48_000,
        }
    }

    pub fn with_inputs(self, inputs: Vec<InputDevice>) -> Self {
        self.state.lock().inputs = inputs;
        self
    }

    pub fn with_max_input_channels(self, channels: u16) -> Self {
        self.state.lock().max_input_channels = channels;
        self
    }

    pub fn with_bluetooth_headset(self) -> Self {
        self.state.lock().bluetooth_headset = true;
        self
    }

    /// Make the named operation fail from now on.
    pub fn fail(&self, op: &'static str) {
        self.state.lock().failing.insert(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn preferred_input(&self) -> Option<String> {
        self.state.lock().preferred_input.clone()
    }

    fn record(&self, op: &'static str, detail: String) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.push(format!("{}({})", op, detail));
        if state.failing.contains(op) {
            return Err(PlatformError::new(format!("{} refused", op)));
        }
        Ok(())
    }
}

impl AudioPlatform for FakePlatform {
    fn set_category(
        &self,
        category: AudioCategory,
        mode: AudioMode,
        _options: CategoryOptions,
    ) -> Result<(), PlatformError> {
        match mode {
            AudioMode::Normal => self.record("set_category", format!("{:?}", category)),
            mode => self.record("set_category", format!("{:?}, {:?}", category, mode)),
        }
    }

    fn set_preferred_sample_rate(&self, sample_rate: u32) -> Result<(), PlatformError> {
        self.record("set_preferred_sample_rate", sample_rate.to_string())
    }

    fn max_sample_rate(&self) -> u32 {
        self.ceiling
    }

    fn set_active(&self, active: bool) -> Result<(), PlatformError> {
        self.record("set_active", active.to_string())?;
        self.state.lock().active = active;
        Ok(())
    }

    fn max_input_channels(&self) -> u16 {
        self.state.lock().max_input_channels
    }

    fn current_sample_rate(&self) -> u32 {
        44_100
    }

    fn set_preferred_input_channels(&self, channels: u16) -> Result<(), PlatformError> {
        self.record("set_preferred_input_channels", channels.to_string())
    }

    fn available_inputs(&self) -> Result<Vec<InputDevice>, PlatformError> {
        self.record("available_inputs", String::new())?;
        Ok(self.state.lock().inputs.clone())
    }

    fn set_preferred_input(&self, device: &InputDevice) -> Result<(), PlatformError> {
        self.record("set_preferred_input", device.id.to_string())?;
        self.state.lock().preferred_input = Some(device.id.to_string());
        Ok(())
    }

    fn set_speakerphone(&self, on: bool) -> Result<(), PlatformError> {
        self.record("set_speakerphone", on.to_string())
    }

    fn start_bluetooth_sco(&self) -> Result<bool, PlatformError> {
        if !self.state.lock().bluetooth_headset {
            return Ok(false);
        }
        self.record("start_bluetooth_sco", String::new())?;
        Ok(true)
    }

    fn stop_bluetooth_sco(&self) -> Result<(), PlatformError> {
        self.record("stop_bluetooth_sco", String::new())
    }
}

#[derive(Default)]
pub struct FakeInterruptions {
    sinks: Mutex<HashMap<u64, Sender<InterruptionEvent>>>,
    next: Mutex<u64>,
    fail_unsubscribe: Mutex<bool>,
}

impl FakeInterruptions {
    pub fn subscribers(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn emit(&self, event: InterruptionEvent) {
        for sink in self.sinks.lock().values() {
            let _ = sink.send(event);
        }
    }

    pub fn fail_unsubscribe(&self) {
        *self.fail_unsubscribe.lock() = true;
    }
}

impl InterruptionSource for FakeInterruptions {
    fn subscribe(&self, sink: Sender<InterruptionEvent>) -> Result<SubscriptionToken, PlatformError> {
        let mut next = self.next.lock();
        *next += 1;
        self.sinks.lock().insert(*next, sink);
        Ok(SubscriptionToken(*next))
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> Result<(), PlatformError> {
        self.sinks.lock().remove(&token.0);
        if *self.fail_unsubscribe.lock() {
            return Err(PlatformError::new("observer already removed"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeKeeper {
    unsupported: bool,
    started: Mutex<Vec<ResolvedNotification>>,
    live: Mutex<HashSet<u64>>,
}

impl FakeKeeper {
    pub fn unsupported() -> Self {
        Self {
            unsupported: true,
            ..Default::default()
        }
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().len()
    }

    pub fn live(&self) -> usize {
        self.live.lock().len()
    }

    pub fn last_notification(&self) -> Option<ResolvedNotification> {
        self.started.lock().last().cloned()
    }
}

impl ContinuityKeeper for FakeKeeper {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn start(&self, notification: &ResolvedNotification) -> Result<KeeperHandle, PlatformError> {
        let mut started = self.started.lock();
        started.push(notification.clone());
        let id = started.len() as u64;
        self.live.lock().insert(id);
        Ok(KeeperHandle(id))
    }

    fn stop(&self, handle: KeeperHandle) -> Result<(), PlatformError> {
        self.live.lock().remove(&handle.0);
        Ok(())
    }
}

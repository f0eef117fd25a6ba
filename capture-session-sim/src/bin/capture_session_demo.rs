//! Walks a capture session through a phone call on a simulated handset.
//!
//! Usage: `capture-session-demo [REQUEST_JSON]`
//!
//! Set `RUST_LOG=debug` to see the platform calls.

use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use capture_session_core::{
    CaptureRequest, InputDevice, SessionDelegate, SessionError, SessionState,
};
use capture_session_sim::SimulatedDevice;

const DEFAULT_REQUEST: &str = r#"{
    "output": "demo-take.m4a",
    "sampleRate": 96000,
    "numChannels": 2,
    "deviceId": "bt-headset",
    "enableBackgroundRecording": true,
    "notification": { "title": "Demo recording" }
}"#;

struct LogDelegate;

impl SessionDelegate for LogDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        log::info!("state -> {}", state.name());
    }

    fn on_error(&self, error: &SessionError) {
        log::error!("session error: {}", error);
    }
}

fn main() -> Result<(), SessionError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let json = env::args().nth(1).unwrap_or_else(|| DEFAULT_REQUEST.to_string());
    let request = CaptureRequest::from_json(&json)?;

    let device = SimulatedDevice::new();
    device
        .audio
        .plug_in(InputDevice::new("bt-headset", "Bluetooth Headset", 1));
    device.audio.set_bluetooth_headset(true);

    let session = device.session();
    session.set_delegate(Arc::new(LogDelegate));

    let id = session.start(request)?;
    log::info!("session {} route: {:?}", id, session.active_route());

    log::info!("incoming call");
    device.interruptions.begin_interruption();
    thread::sleep(Duration::from_millis(200));

    log::info!("call ended, headset disconnected");
    device.interruptions.end_interruption(true);
    device.audio.unplug("bt-headset");
    device.audio.set_bluetooth_headset(false);
    thread::sleep(Duration::from_millis(200));

    session.resume()?;
    log::info!("resumed on route: {:?}", session.active_route());

    session.stop()?;
    log::info!(
        "foreground registrations started: {}, still running: {}",
        device.foreground.start_count(),
        device.foreground.running_count()
    );
    Ok(())
}

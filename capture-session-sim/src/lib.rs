//! # capture-session-sim
//!
//! In-memory simulated mobile audio platform for `capture-session-core`.
//!
//! Provides:
//! - `SimAudioSession`: audio subsystem with hardware limits, hot-pluggable
//!   inputs, fault injection and a call journal
//! - `SimInterruptionCenter`: system interruption notifications
//! - `SimForegroundService`: background continuity keeper
//!
//! ## Usage
//! ```no_run
//! use capture_session_core::CaptureRequest;
//! use capture_session_sim::SimulatedDevice;
//!
//! let device = SimulatedDevice::new();
//! let session = device.session();
//! session.start(CaptureRequest {
//!     output: Some("memo.m4a".into()),
//!     ..Default::default()
//! })?;
//! device.interruptions.begin_interruption();
//! # Ok::<(), capture_session_core::SessionError>(())
//! ```

pub mod audio_session;
pub mod foreground;
pub mod interruptions;

use std::sync::Arc;

use capture_session_core::CaptureSession;

pub use audio_session::{HardwareState, SimAudioSession, SimOp};
pub use foreground::SimForegroundService;
pub use interruptions::SimInterruptionCenter;

/// One simulated handset: audio session, notification center and keeper.
#[derive(Clone)]
pub struct SimulatedDevice {
    pub audio: Arc<SimAudioSession>,
    pub interruptions: Arc<SimInterruptionCenter>,
    pub foreground: Arc<SimForegroundService>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self::with_parts(SimAudioSession::new(), SimForegroundService::new())
    }

    pub fn with_parts(audio: SimAudioSession, foreground: SimForegroundService) -> Self {
        Self {
            audio: Arc::new(audio),
            interruptions: Arc::new(SimInterruptionCenter::new()),
            foreground: Arc::new(foreground),
        }
    }

    /// A capture session wired to this device.
    pub fn session(&self) -> CaptureSession {
        CaptureSession::new(
            self.audio.clone(),
            self.interruptions.clone(),
            self.foreground.clone(),
        )
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

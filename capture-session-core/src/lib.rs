//! # capture-session-core
//!
//! Platform-agnostic core for a live mobile audio-capture session.
//!
//! Applies a recording configuration to the platform audio subsystem,
//! selects the input device, pauses on system interruptions and keeps the
//! process alive in the background. Platform backends implement
//! `AudioPlatform`, `InterruptionSource` and `ContinuityKeeper` and plug
//! into the generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! capture-session-core (this crate)
//! ├── traits/   ← AudioPlatform, InterruptionSource, ContinuityKeeper, SessionDelegate
//! ├── models/   ← CaptureConfiguration, InputDevice, ActiveRoute, SessionState, SessionError
//! └── session/  ← DeviceSelector, RouteManager, InterruptionMonitor, ContinuitySignal,
//!                 CaptureSession (state machine)
//! ```

pub mod models;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::config::{
    CaptureConfiguration, CaptureRequest, CategoryOptions, DevicePolicy, NotificationDescriptor,
    OutputTarget, ResolvedNotification, PLATFORM_SAMPLE_RATE_CEILING,
};
pub use models::device::{DeviceId, InputDevice};
pub use models::error::{PlatformError, SessionError, TeardownFailure, TeardownStep};
pub use models::route::{ActiveRoute, AudioCategory, AudioMode, RouteId};
pub use models::state::SessionState;
pub use session::capture_session::CaptureSession;
pub use session::continuity::ContinuitySignal;
pub use session::device_selector::DeviceSelector;
pub use session::interruption_monitor::InterruptionMonitor;
pub use session::route_manager::RouteManager;
pub use traits::audio_platform::AudioPlatform;
pub use traits::continuity_keeper::{ContinuityKeeper, KeeperHandle};
pub use traits::interruption_source::{InterruptionEvent, InterruptionSource, SubscriptionToken};
pub use traits::session_delegate::SessionDelegate;

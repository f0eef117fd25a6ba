use std::sync::mpsc::Sender;

use crate::models::error::PlatformError;

/// Payload of a system interruption notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionEvent {
    /// Another process or system feature claimed the audio hardware.
    Began,
    /// The hardware was released. `should_resume` is the platform's hint.
    Ended { should_resume: bool },
}

/// Token returned by [`InterruptionSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

/// The system interruption notification channel.
///
/// The platform pushes events into `sink` from whatever thread it delivers
/// notifications on.
pub trait InterruptionSource: Send + Sync {
    fn subscribe(&self, sink: Sender<InterruptionEvent>) -> Result<SubscriptionToken, PlatformError>;

    fn unsubscribe(&self, token: SubscriptionToken) -> Result<(), PlatformError>;
}

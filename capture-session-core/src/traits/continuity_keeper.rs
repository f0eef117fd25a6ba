use crate::models::config::ResolvedNotification;
use crate::models::error::PlatformError;

/// Handle for a running keeper registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeeperHandle(pub u64);

/// OS facility keeping the process alive while the host app is in the
/// background (foreground service on Android, background audio on iOS).
pub trait ContinuityKeeper: Send + Sync {
    /// `false` on OS versions without the feature. Start and stop then
    /// become no-ops.
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&self, notification: &ResolvedNotification) -> Result<KeeperHandle, PlatformError>;

    fn stop(&self, handle: KeeperHandle) -> Result<(), PlatformError>;
}

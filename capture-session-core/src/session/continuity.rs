use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::NotificationDescriptor;
use crate::models::error::{PlatformError, SessionError};
use crate::traits::continuity_keeper::{ContinuityKeeper, KeeperHandle};

/// Holds at most one continuity-keeper registration for the session.
pub struct ContinuitySignal {
    keeper: Arc<dyn ContinuityKeeper>,
    handle: Mutex<Option<KeeperHandle>>,
}

impl ContinuitySignal {
    pub fn new(keeper: Arc<dyn ContinuityKeeper>) -> Self {
        Self {
            keeper,
            handle: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Register with the keeper, filling defaults into `descriptor`.
    /// No-op when already registered or when the OS lacks the feature.
    pub fn start(&self, descriptor: &NotificationDescriptor) -> Result<(), SessionError> {
        let mut slot = self.handle.lock();
        if slot.is_some() {
            log::debug!("Continuity keeper already running");
            return Ok(());
        }
        if !self.keeper.is_supported() {
            log::info!("Continuity keeper unsupported on this platform, background capture not guaranteed");
            return Ok(());
        }

        let notification = descriptor.resolve();
        let handle = self
            .keeper
            .start(&notification)
            .map_err(|e| SessionError::ContinuityFailed(e.to_string()))?;
        log::info!("Continuity keeper started: \"{}\"", notification.title);
        *slot = Some(handle);
        Ok(())
    }

    /// Release the registration. Stopping when never started is fine.
    pub fn stop(&self) -> Result<(), PlatformError> {
        let Some(handle) = self.handle.lock().take() else {
            return Ok(());
        };
        self.keeper.stop(handle)?;
        log::info!("Continuity keeper stopped");
        Ok(())
    }
}

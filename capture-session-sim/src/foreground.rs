//! Simulated foreground-service / background-audio keeper.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use capture_session_core::models::config::ResolvedNotification;
use capture_session_core::models::error::PlatformError;
use capture_session_core::traits::continuity_keeper::{ContinuityKeeper, KeeperHandle};

#[derive(Default)]
struct Inner {
    running: BTreeMap<u64, ResolvedNotification>,
    next_handle: u64,
    start_count: usize,
    fail_start: bool,
    fail_stop: bool,
}

/// Keeps track of foreground registrations and the notification each one posted.
pub struct SimForegroundService {
    inner: Mutex<Inner>,
    supported: bool,
}

impl SimForegroundService {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            supported: true,
        }
    }

    /// An OS version without the facility.
    pub fn unsupported() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            supported: false,
        }
    }

    pub fn running_count(&self) -> usize {
        self.inner.lock().running.len()
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().start_count
    }

    /// The notification currently shown, if a registration is running.
    pub fn notification(&self) -> Option<ResolvedNotification> {
        self.inner.lock().running.values().next_back().cloned()
    }

    pub fn fail_start(&self, fail: bool) {
        self.inner.lock().fail_start = fail;
    }

    /// The registration is still dropped; only the reported result fails.
    pub fn fail_stop(&self, fail: bool) {
        self.inner.lock().fail_stop = fail;
    }
}

impl Default for SimForegroundService {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuityKeeper for SimForegroundService {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&self, notification: &ResolvedNotification) -> Result<KeeperHandle, PlatformError> {
        let mut inner = self.inner.lock();
        if inner.fail_start {
            return Err(PlatformError::new("foreground start not allowed"));
        }
        inner.next_handle += 1;
        let handle = inner.next_handle;
        inner.running.insert(handle, notification.clone());
        inner.start_count += 1;
        log::debug!("sim: foreground registration {} posted \"{}\"", handle, notification.title);
        Ok(KeeperHandle(handle))
    }

    fn stop(&self, handle: KeeperHandle) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock();
        inner.running.remove(&handle.0);
        if inner.fail_stop {
            return Err(PlatformError::new("service did not stop cleanly"));
        }
        Ok(())
    }
}

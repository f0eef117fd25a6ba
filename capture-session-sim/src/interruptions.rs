//! Simulated system interruption notification center.

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;

use parking_lot::Mutex;

use capture_session_core::models::error::PlatformError;
use capture_session_core::traits::interruption_source::{
    InterruptionEvent, InterruptionSource, SubscriptionToken,
};

#[derive(Default)]
struct Inner {
    observers: BTreeMap<u64, Sender<InterruptionEvent>>,
    next_token: u64,
    subscribe_count: usize,
    fail_subscribe: bool,
    fail_unsubscribe: bool,
}

/// Delivers interruption notifications to registered observers.
#[derive(Default)]
pub struct SimInterruptionCenter {
    inner: Mutex<Inner>,
}

impl SimInterruptionCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A phone call, alarm or another app seizes the audio hardware.
    pub fn begin_interruption(&self) {
        self.post(InterruptionEvent::Began);
    }

    pub fn end_interruption(&self, should_resume: bool) {
        self.post(InterruptionEvent::Ended { should_resume });
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    /// Total number of successful subscriptions ever made.
    pub fn subscribe_count(&self) -> usize {
        self.inner.lock().subscribe_count
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.inner.lock().fail_subscribe = fail;
    }

    /// The observer is still removed; only the reported result fails.
    pub fn fail_unsubscribe(&self, fail: bool) {
        self.inner.lock().fail_unsubscribe = fail;
    }

    fn post(&self, event: InterruptionEvent) {
        let mut inner = self.inner.lock();
        log::debug!("sim: posting {:?} to {} observers", event, inner.observers.len());
        inner.observers.retain(|_, sink| sink.send(event).is_ok());
    }
}

impl InterruptionSource for SimInterruptionCenter {
    fn subscribe(&self, sink: Sender<InterruptionEvent>) -> Result<SubscriptionToken, PlatformError> {
        let mut inner = self.inner.lock();
        if inner.fail_subscribe {
            return Err(PlatformError::new("notification center refused observer"));
        }
        inner.next_token += 1;
        let token = inner.next_token;
        inner.observers.insert(token, sink);
        inner.subscribe_count += 1;
        Ok(SubscriptionToken(token))
    }

    fn unsubscribe(&self, token: SubscriptionToken) -> Result<(), PlatformError> {
        let mut inner = self.inner.lock();
        inner.observers.remove(&token.0);
        if inner.fail_unsubscribe {
            return Err(PlatformError::new("observer removal failed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn events_reach_observers_until_removed() {
        let center = SimInterruptionCenter::new();
        let (tx, rx) = mpsc::channel();
        let token = center.subscribe(tx).unwrap();

        center.begin_interruption();
        assert_eq!(rx.try_recv(), Ok(InterruptionEvent::Began));

        center.unsubscribe(token).unwrap();
        center.end_interruption(true);
        assert!(rx.try_recv().is_err());
        assert_eq!(center.observer_count(), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let center = SimInterruptionCenter::new();
        let (tx, rx) = mpsc::channel();
        center.subscribe(tx).unwrap();
        drop(rx);

        center.begin_interruption();
        assert_eq!(center.observer_count(), 0);
    }
}

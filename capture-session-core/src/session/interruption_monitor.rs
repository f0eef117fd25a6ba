use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::{PlatformError, SessionError};
use crate::traits::interruption_source::{InterruptionEvent, InterruptionSource, SubscriptionToken};

/// Invoked on the dispatcher thread when an interruption begins.
pub type InterruptionHandler = Arc<dyn Fn() + Send + Sync + 'static>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Subscription {
    token: SubscriptionToken,
    running: Arc<AtomicBool>,
    dispatcher: Option<thread::JoinHandle<()>>,
}

/// Owns the session's subscription to system interruption notifications.
///
/// Platform callbacks push events into a channel; a single dispatcher
/// thread drains it, so the session sees interruptions one at a time.
/// Only `Began` is acted on. An `Ended` event never resumes capture;
/// resuming is left to the caller.
pub struct InterruptionMonitor {
    source: Arc<dyn InterruptionSource>,
    subscription: Mutex<Option<Subscription>>,
}

impl InterruptionMonitor {
    pub fn new(source: Arc<dyn InterruptionSource>) -> Self {
        Self {
            source,
            subscription: Mutex::new(None),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Subscribe once. A second call while subscribed is a no-op.
    pub fn subscribe(&self, on_began: InterruptionHandler) -> Result<(), SessionError> {
        let mut slot = self.subscription.lock();
        if slot.is_some() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel();
        let token = self
            .source
            .subscribe(tx)
            .map_err(|e| SessionError::InterruptionSubscriptionFailed(e.to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let spawned = thread::Builder::new()
            .name("interruption-monitor".into())
            .spawn(move || dispatch_loop(rx, thread_running, on_began));

        let dispatcher = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(unsub) = self.source.unsubscribe(token) {
                    log::warn!("Failed to unsubscribe after dispatcher spawn failure: {}", unsub);
                }
                return Err(SessionError::InterruptionSubscriptionFailed(format!(
                    "failed to spawn dispatcher: {}",
                    e
                )));
            }
        };

        log::debug!("Subscribed to interruptions (token {})", token.0);
        *slot = Some(Subscription {
            token,
            running,
            dispatcher: Some(dispatcher),
        });
        Ok(())
    }

    /// Release the subscription. Safe to call any number of times; only the
    /// first call after `subscribe` talks to the platform.
    pub fn unsubscribe(&self) -> Result<(), PlatformError> {
        let Some(mut subscription) = self.subscription.lock().take() else {
            return Ok(());
        };

        subscription.running.store(false, Ordering::SeqCst);
        let result = self.source.unsubscribe(subscription.token);

        if let Some(handle) = subscription.dispatcher.take() {
            // Teardown can be triggered from a handler running on the dispatcher itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }

        log::debug!("Unsubscribed from interruptions (token {})", subscription.token.0);
        result
    }
}

impl Drop for InterruptionMonitor {
    fn drop(&mut self) {
        if let Err(e) = self.unsubscribe() {
            log::warn!("Interruption unsubscribe on drop failed: {}", e);
        }
    }
}

fn dispatch_loop(rx: Receiver<InterruptionEvent>, running: Arc<AtomicBool>, on_began: InterruptionHandler) {
    while running.load(Ordering::SeqCst) {
        let event = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }

        match event {
            InterruptionEvent::Began => {
                log::info!("Audio interruption began");
                on_began();
            }
            InterruptionEvent::Ended { should_resume } => {
                log::info!(
                    "Audio interruption ended (should_resume={}), waiting for explicit resume",
                    should_resume
                );
            }
        }
    }
}
